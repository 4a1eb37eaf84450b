//! Per-user index of active session ids.
//!
//! Shared across service instances. A session id is a member of its
//! owner's set iff the session is ACTIVE. Lifecycle code adds after the
//! record is stored and removes only after the close is durably saved, so
//! the index can hold a stale id (readers evict it lazily) but never miss
//! a live one.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::domain::foundation::{DomainError, SessionId, UserId};

#[async_trait]
pub trait UserSessionIndex: Send + Sync {
    async fn add(&self, user_id: &UserId, session_id: &SessionId) -> Result<(), DomainError>;

    /// Removing a non-member succeeds.
    async fn remove(&self, user_id: &UserId, session_id: &SessionId) -> Result<(), DomainError>;

    async fn members(&self, user_id: &UserId) -> Result<HashSet<SessionId>, DomainError>;
}
