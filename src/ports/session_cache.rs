//! Session cache port (fast, TTL-bearing, non-authoritative).
//!
//! A cache-aside layer in front of the [`SessionStore`](super::SessionStore).
//! Every `put` restarts the entry's TTL window. The TTL is a safety net
//! that is configured looser than the domain idle timeout; expiring
//! sessions is the sweeper's job, not eviction's.
//!
//! Callers treat every error from this port as a miss and fall back to the
//! store. A cached record is a hint: its status must still be honoured.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::foundation::{DomainError, SessionId};
use crate::domain::session::SessionRecord;

#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Returns the cached record, or `None` on a miss.
    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>, DomainError>;

    /// Stores `record` and (re)starts its TTL window.
    async fn put(&self, record: &SessionRecord, ttl: Duration) -> Result<(), DomainError>;

    /// Evicts the entry. Deleting a missing entry succeeds.
    async fn delete(&self, id: &SessionId) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cache_is_object_safe() {
        fn _accepts_dyn(_cache: &dyn SessionCache) {}
    }
}
