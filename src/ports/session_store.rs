//! Session store port (durable, authoritative).
//!
//! Defines the contract for persisting session records. The store is the
//! single source of truth: caches and indexes are repaired from it, and it
//! is the only place closed sessions remain queryable.
//!
//! # Design
//!
//! - **Upsert by id**: `save` is idempotent
//! - **Atomic per-record changes**: `update` applies a [`SessionChange`]
//!   under the store's own lock so concurrent activity never loses counts
//! - **Never deletes**: closed sessions are retained for analytics/audit

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::domain::foundation::{DomainError, SessionId, SessionStatus, Timestamp, UserId};
use crate::domain::session::{ChangeOutcome, DeviceFilter, SessionChange, SessionRecord};

/// Result of an atomic [`SessionStore::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChange {
    /// The record as it stands after the change (or unchanged).
    pub record: SessionRecord,
    pub outcome: ChangeOutcome,
}

/// Repository port for durable session persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a brand-new record.
    ///
    /// Returns `false` without writing if the id already exists.
    async fn insert(&self, record: &SessionRecord) -> Result<bool, DomainError>;

    /// Idempotent upsert keyed by session id.
    ///
    /// Repair and backfill entry point: writes a whole record regardless of
    /// what is stored. Lifecycle paths never call it; they go through
    /// `insert` and the atomic `update` so concurrent changes are not lost.
    async fn save(&self, record: &SessionRecord) -> Result<SessionRecord, DomainError>;

    /// Find a session by its id.
    ///
    /// Returns `None` if not found.
    async fn find_by_id(&self, id: &SessionId) -> Result<Option<SessionRecord>, DomainError>;

    /// Atomically load, apply `change` at `now`, and persist if changed.
    ///
    /// Returns `None` if the session does not exist.
    async fn update(
        &self,
        id: &SessionId,
        change: &SessionChange,
        now: Timestamp,
    ) -> Result<Option<StoredChange>, DomainError>;

    /// Active sessions owned by a user.
    async fn find_active_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SessionRecord>, DomainError>;

    /// Every session (any status) owned by a user.
    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Vec<SessionRecord>, DomainError>;

    async fn find_by_status(&self, status: SessionStatus)
        -> Result<Vec<SessionRecord>, DomainError>;

    /// Sessions with `status == ACTIVE AND last_activity_time < cutoff`.
    async fn find_expired_active(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<SessionRecord>, DomainError>;

    /// Sessions whose last activity lies within `[start, end]`.
    async fn find_by_activity_range(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<SessionRecord>, DomainError>;

    /// Sessions started within `[start, end]`, any status.
    async fn find_by_start_range(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<SessionRecord>, DomainError>;

    /// Active sessions matching a device-context filter.
    async fn find_active_by_device(
        &self,
        filter: &DeviceFilter,
    ) -> Result<Vec<SessionRecord>, DomainError>;

    async fn find_by_authentication_token(
        &self,
        token: &str,
    ) -> Result<Option<SessionRecord>, DomainError>;

    async fn find_by_refresh_token(&self, token: &str)
        -> Result<Option<SessionRecord>, DomainError>;

    async fn count_active(&self) -> Result<u64, DomainError>;

    async fn count_all(&self) -> Result<u64, DomainError>;

    /// Active sessions grouped by device type.
    async fn count_active_by_device_type(&self) -> Result<BTreeMap<String, u64>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn session_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn SessionStore) {}
    }
}
