//! In-memory adapters for tests and local development.

mod session_cache;
mod session_store;
mod user_session_index;

pub use session_cache::InMemorySessionCache;
pub use session_store::InMemorySessionStore;
pub use user_session_index::InMemoryUserSessionIndex;
