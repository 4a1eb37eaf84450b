//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the session core and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `SessionStore` - Durable, authoritative session records
//! - `SessionCache` - TTL cache fronting the store (cache-aside)
//! - `UserSessionIndex` - Per-user set of active session ids
//!
//! ## Environment Ports
//!
//! - `Clock` - Source of the current time

mod clock;
mod session_cache;
mod session_store;
mod user_session_index;

pub use clock::Clock;
pub use session_cache::SessionCache;
pub use session_store::{SessionStore, StoredChange};
pub use user_session_index::UserSessionIndex;
