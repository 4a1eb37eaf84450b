//! PostgreSQL adapters - durable implementations of storage ports.
//!
//! - `PostgresSessionStore` - authoritative session records (`user_sessions`)

mod session_store;

pub use session_store::PostgresSessionStore;
