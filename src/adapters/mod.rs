//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the session core to external systems:
//! - `postgres` - Durable session store
//! - `redis` - Shared fast cache and per-user index
//! - `memory` - In-process implementations of every storage port
//! - `clock` - System and manually driven clocks

pub mod clock;
pub mod memory;
pub mod postgres;
pub mod redis;

pub use clock::{ManualClock, SystemClock};
pub use memory::{InMemorySessionCache, InMemorySessionStore, InMemoryUserSessionIndex};
pub use postgres::PostgresSessionStore;
pub use redis::{RedisKeys, RedisSessionCache, RedisUserSessionIndex};
