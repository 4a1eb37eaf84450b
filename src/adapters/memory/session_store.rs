//! In-memory session store for testing and single-process development.
//!
//! Per-record atomicity comes from holding the map's write lock across
//! load, apply and write-back. Not durable.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, SessionId, SessionStatus, Timestamp, UserId};
use crate::domain::session::{
    ChangeOutcome, DeviceFilter, SessionChange, SessionRecord, UNKNOWN_DEVICE_TYPE,
};
use crate::ports::{SessionStore, StoredChange};

#[derive(Debug, Default, Clone)]
pub struct InMemorySessionStore {
    records: Arc<RwLock<HashMap<SessionId, SessionRecord>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records (any status).
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    async fn collect<F>(&self, predicate: F) -> Vec<SessionRecord>
    where
        F: Fn(&SessionRecord) -> bool,
    {
        let records = self.records.read().await;
        let mut matched: Vec<SessionRecord> =
            records.values().filter(|r| predicate(r)).cloned().collect();
        matched.sort_by(|a, b| b.last_activity_time().cmp(&a.last_activity_time()));
        matched
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, record: &SessionRecord) -> Result<bool, DomainError> {
        let mut records = self.records.write().await;
        if records.contains_key(record.session_id()) {
            return Ok(false);
        }
        records.insert(record.session_id().clone(), record.clone());
        Ok(true)
    }

    async fn save(&self, record: &SessionRecord) -> Result<SessionRecord, DomainError> {
        self.records
            .write()
            .await
            .insert(record.session_id().clone(), record.clone());
        Ok(record.clone())
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<SessionRecord>, DomainError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn update(
        &self,
        id: &SessionId,
        change: &SessionChange,
        now: Timestamp,
    ) -> Result<Option<StoredChange>, DomainError> {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(id) else {
            return Ok(None);
        };

        let mut next = record.clone();
        let outcome = next.apply(change, now);
        if outcome == ChangeOutcome::Changed {
            *record = next.clone();
        }

        Ok(Some(StoredChange {
            record: if outcome == ChangeOutcome::Changed {
                next
            } else {
                record.clone()
            },
            outcome,
        }))
    }

    async fn find_active_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SessionRecord>, DomainError> {
        Ok(self
            .collect(|r| r.is_active() && r.user_id() == user_id)
            .await)
    }

    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Vec<SessionRecord>, DomainError> {
        Ok(self.collect(|r| r.user_id() == user_id).await)
    }

    async fn find_by_status(
        &self,
        status: SessionStatus,
    ) -> Result<Vec<SessionRecord>, DomainError> {
        Ok(self.collect(|r| r.status() == status).await)
    }

    async fn find_expired_active(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<SessionRecord>, DomainError> {
        Ok(self.collect(|r| r.is_idle_since(cutoff)).await)
    }

    async fn find_by_activity_range(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<SessionRecord>, DomainError> {
        Ok(self
            .collect(|r| r.last_activity_time() >= start && r.last_activity_time() <= end)
            .await)
    }

    async fn find_by_start_range(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<SessionRecord>, DomainError> {
        Ok(self
            .collect(|r| r.start_time() >= start && r.start_time() <= end)
            .await)
    }

    async fn find_active_by_device(
        &self,
        filter: &DeviceFilter,
    ) -> Result<Vec<SessionRecord>, DomainError> {
        Ok(self.collect(|r| r.is_active() && filter.matches(r)).await)
    }

    async fn find_by_authentication_token(
        &self,
        token: &str,
    ) -> Result<Option<SessionRecord>, DomainError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|r| r.authentication_token() == Some(token))
            .cloned())
    }

    async fn find_by_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<SessionRecord>, DomainError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|r| r.refresh_token() == Some(token))
            .cloned())
    }

    async fn count_active(&self) -> Result<u64, DomainError> {
        let records = self.records.read().await;
        Ok(records.values().filter(|r| r.is_active()).count() as u64)
    }

    async fn count_all(&self) -> Result<u64, DomainError> {
        Ok(self.records.read().await.len() as u64)
    }

    async fn count_active_by_device_type(&self) -> Result<BTreeMap<String, u64>, DomainError> {
        let records = self.records.read().await;
        let mut counts = BTreeMap::new();
        for record in records.values().filter(|r| r.is_active()) {
            let device = record.device_type().unwrap_or(UNKNOWN_DEVICE_TYPE).to_string();
            *counts.entry(device).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
