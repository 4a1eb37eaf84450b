//! SessionGateway - cache-aside access to session records.
//!
//! Every application component reads and writes sessions through here so
//! the cache/store/index precedence rules live in one place:
//!
//! - Reads consult the cache first and fall back to the store on a miss or
//!   a cache failure, repopulating the cache afterwards.
//! - Writes go to the store first (atomically, via [`SessionStore::update`]),
//!   then refresh or evict the cache. A closed record that cannot be evicted
//!   overwrites the cached copy.
//! - A record seen closed is removed from the index only after the store
//!   holds it closed.
//!
//! Cache and index failures are logged and swallowed. Store failures
//! surface as [`SessionError::BackendUnavailable`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::foundation::{SessionId, Timestamp, UserId};
use crate::domain::session::{ChangeOutcome, SessionChange, SessionError, SessionRecord};
use crate::ports::{Clock, SessionCache, SessionStore, StoredChange, UserSessionIndex};

/// Timing rules shared by the lifecycle components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Inactivity after which an ACTIVE session is expired by the sweeper.
    pub idle_timeout: Duration,
    /// Cache entry lifetime; kept strictly longer than `idle_timeout`.
    pub cache_ttl: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30 * 60),
            cache_ttl: Duration::from_secs(31 * 60),
        }
    }
}

impl SessionPolicy {
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }
}

/// Cache-aside session access shared by the application components.
#[derive(Clone)]
pub struct SessionGateway {
    store: Arc<dyn SessionStore>,
    cache: Arc<dyn SessionCache>,
    index: Arc<dyn UserSessionIndex>,
    clock: Arc<dyn Clock>,
    policy: SessionPolicy,
}

impl SessionGateway {
    pub fn new(
        store: Arc<dyn SessionStore>,
        cache: Arc<dyn SessionCache>,
        index: Arc<dyn UserSessionIndex>,
        clock: Arc<dyn Clock>,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            store,
            cache,
            index,
            clock,
            policy,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    pub fn index(&self) -> &dyn UserSessionIndex {
        self.index.as_ref()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Cache-aside read of a session in any status.
    ///
    /// A cached ACTIVE record whose idle window has lapsed is treated as a
    /// miss, since the store may already hold it closed.
    pub async fn load(&self, id: &SessionId) -> Result<SessionRecord, SessionError> {
        let mut stale = false;
        match self.cache.get(id).await {
            Ok(Some(record)) => {
                let cutoff = self.clock.now().minus(self.policy.idle_timeout);
                if !record.is_idle_since(cutoff) {
                    debug!(session_id = %id, "Session cache hit");
                    return Ok(record);
                }
                debug!(session_id = %id, "Cached session past idle window, using store");
                stale = true;
            }
            Ok(None) => debug!(session_id = %id, "Session cache miss"),
            Err(e) => warn!(session_id = %id, error = %e, "Session cache read failed, using store"),
        }

        let record = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;

        if record.is_active() {
            self.cache_put(&record).await;
        } else if stale {
            self.cache_retire(&record).await;
        }
        Ok(record)
    }

    /// Reads a session and refuses closed ones.
    pub async fn load_active(&self, id: &SessionId) -> Result<SessionRecord, SessionError> {
        let record = self.load(id).await?;
        if !record.is_active() {
            return Err(SessionError::closed(id.clone(), record.status()));
        }
        Ok(record)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Applies `change` atomically in the store, then repairs cache and index.
    ///
    /// Returns the raw outcome; callers decide what `Closed` and
    /// `Unchanged` mean for their operation.
    pub async fn apply(
        &self,
        id: &SessionId,
        change: SessionChange,
    ) -> Result<StoredChange, SessionError> {
        let now = self.clock.now();
        let stored = self
            .store
            .update(id, &change, now)
            .await?
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;

        debug!(
            session_id = %id,
            change = change.name(),
            outcome = ?stored.outcome,
            "Session change applied"
        );

        if stored.record.is_active() {
            self.cache_put(&stored.record).await;
        } else {
            self.cache_retire(&stored.record).await;
            self.index_remove(stored.record.user_id(), id).await;
        }

        Ok(stored)
    }

    /// Applies a non-closing change to an ACTIVE session.
    ///
    /// Fails with `Closed` if the session is (or concurrently became)
    /// EXPIRED or TERMINATED.
    pub async fn mutate(
        &self,
        id: &SessionId,
        change: SessionChange,
    ) -> Result<SessionRecord, SessionError> {
        self.load_active(id).await?;

        let stored = self.apply(id, change).await?;
        match stored.outcome {
            ChangeOutcome::Closed => Err(SessionError::closed(id.clone(), stored.record.status())),
            ChangeOutcome::Changed | ChangeOutcome::Unchanged => Ok(stored.record),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Best-effort cache and index maintenance
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn cache_put(&self, record: &SessionRecord) {
        if let Err(e) = self.cache.put(record, self.policy.cache_ttl).await {
            warn!(session_id = %record.session_id(), error = %e, "Session cache write failed");
        }
    }

    /// Removes a closed record from the cache. If the delete fails the
    /// entry is overwritten with the closed record instead, so readers never
    /// see the superseded ACTIVE copy.
    pub async fn cache_retire(&self, record: &SessionRecord) {
        let id = record.session_id();
        if let Err(e) = self.cache.delete(id).await {
            warn!(session_id = %id, error = %e, "Session cache eviction failed, overwriting entry");
            self.cache_put(record).await;
        }
    }

    /// Anonymous sessions are never indexed.
    pub async fn index_add(&self, user_id: &UserId, id: &SessionId) {
        if user_id.is_anonymous() {
            return;
        }
        if let Err(e) = self.index.add(user_id, id).await {
            warn!(user_id = %user_id, session_id = %id, error = %e, "User session index add failed");
        }
    }

    pub async fn index_remove(&self, user_id: &UserId, id: &SessionId) {
        if user_id.is_anonymous() {
            return;
        }
        if let Err(e) = self.index.remove(user_id, id).await {
            warn!(user_id = %user_id, session_id = %id, error = %e, "User session index remove failed");
        }
    }
}

impl std::fmt::Debug for SessionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGateway")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::adapters::{InMemorySessionCache, InMemoryUserSessionIndex, ManualClock};
    use crate::domain::foundation::{DomainError, SessionStatus};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Cache whose first `delete` fails; everything else passes through.
    #[derive(Default)]
    struct FlakyCache {
        inner: InMemorySessionCache,
        tripped: AtomicBool,
    }

    #[async_trait]
    impl SessionCache for FlakyCache {
        async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>, DomainError> {
            self.inner.get(id).await
        }
        async fn put(&self, record: &SessionRecord, ttl: Duration) -> Result<(), DomainError> {
            self.inner.put(record, ttl).await
        }
        async fn delete(&self, id: &SessionId) -> Result<(), DomainError> {
            if !self.tripped.swap(true, Ordering::SeqCst) {
                return Err(DomainError::timeout("cache delete"));
            }
            self.inner.delete(id).await
        }
    }

    #[tokio::test]
    async fn load_populates_cache_on_miss() {
        let fx = Fixture::new();
        let record = fx.seed("s1", "u1").await;

        assert!(fx.cache.peek(record.session_id()).await.is_none());
        let loaded = fx.gateway.load(record.session_id()).await.unwrap();

        assert_eq!(loaded, record);
        assert_eq!(fx.cache.peek(record.session_id()).await, Some(record));
    }

    #[tokio::test]
    async fn load_unknown_session_is_not_found() {
        let fx = Fixture::new();
        let err = fx.gateway.load(&sid("ghost")).await.unwrap_err();
        assert_eq!(err, SessionError::NotFound(sid("ghost")));
    }

    #[tokio::test]
    async fn cache_outage_degrades_to_store() {
        let fx = Fixture::new();
        fx.seed("s1", "u1").await;
        fx.cache.set_online(false);

        let loaded = fx.gateway.load(&sid("s1")).await.unwrap();
        assert_eq!(loaded.user_id().as_str(), "u1");

        let touched = fx.gateway.mutate(&sid("s1"), SessionChange::Touch).await;
        assert!(touched.is_ok());
    }

    #[tokio::test]
    async fn store_outage_is_backend_unavailable() {
        let gateway = SessionGateway::new(
            Arc::new(FailingStore),
            Arc::new(InMemorySessionCache::new()),
            Arc::new(InMemoryUserSessionIndex::new()),
            Arc::new(ManualClock::new(t0())),
            SessionPolicy::default(),
        );

        let err = gateway.load(&sid("s1")).await.unwrap_err();
        assert!(matches!(err, SessionError::BackendUnavailable(_)));
        assert!(!err.is_domain_rule());
    }

    #[tokio::test]
    async fn mutate_refuses_closed_session() {
        let fx = Fixture::new();
        fx.seed("s1", "u1").await;
        fx.gateway
            .apply(&sid("s1"), SessionChange::Terminate)
            .await
            .unwrap();

        let err = fx
            .gateway
            .mutate(&sid("s1"), SessionChange::Touch)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::closed(sid("s1"), SessionStatus::Terminated)
        );
    }

    #[tokio::test]
    async fn closing_evicts_cache_and_index() {
        let fx = Fixture::new();
        let record = fx.seed("s1", "u1").await;
        fx.gateway
            .index_add(record.user_id(), record.session_id())
            .await;
        fx.gateway.load(record.session_id()).await.unwrap();

        fx.gateway
            .apply(record.session_id(), SessionChange::Terminate)
            .await
            .unwrap();

        assert!(fx.cache.peek(record.session_id()).await.is_none());
        assert!(fx
            .index
            .members(record.user_id())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn stale_cached_copy_does_not_allow_mutation() {
        let fx = Fixture::new();
        let record = fx.seed("s1", "u1").await;
        fx.cache
            .put(&record, Duration::from_secs(60))
            .await
            .unwrap();

        // Another instance closes the session behind this cache entry.
        fx.store
            .update(record.session_id(), &SessionChange::Terminate, t0())
            .await
            .unwrap();

        let err = fx
            .gateway
            .mutate(record.session_id(), SessionChange::Touch)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Closed { .. }));
        assert!(fx.cache.peek(record.session_id()).await.is_none());
    }

    #[tokio::test]
    async fn anonymous_sessions_skip_index() {
        let fx = Fixture::new();
        let anon = UserId::anonymous();
        fx.gateway.index_add(&anon, &sid("s1")).await;
        assert!(fx.index.members(&anon).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_eviction_leaves_closed_record_cached() {
        let fx = Fixture::new();
        let cache = Arc::new(FlakyCache::default());
        let gateway = SessionGateway::new(
            fx.store.clone(),
            cache.clone(),
            fx.index.clone(),
            fx.clock.clone(),
            SessionPolicy::default(),
        );
        let record = fx.seed("s1", "u1").await;
        gateway.load(record.session_id()).await.unwrap();

        gateway
            .apply(record.session_id(), SessionChange::Terminate)
            .await
            .unwrap();

        let cached = cache.inner.peek(record.session_id()).await.unwrap();
        assert_eq!(cached.status(), SessionStatus::Terminated);
        let loaded = gateway.load(record.session_id()).await.unwrap();
        assert_eq!(loaded.status(), SessionStatus::Terminated);
    }

    #[tokio::test]
    async fn cached_copy_past_idle_window_is_rechecked_against_store() {
        let fx = Fixture::new();
        let record = fx.seed("s1", "u1").await;
        fx.cache
            .put(&record, Duration::from_secs(3600))
            .await
            .unwrap();

        // Closed in the store while the cache still holds the ACTIVE copy.
        fx.store
            .update(record.session_id(), &SessionChange::Terminate, t0())
            .await
            .unwrap();

        fx.clock.advance(Duration::from_secs(60));
        let within_window = fx.gateway.load(record.session_id()).await.unwrap();
        assert!(within_window.is_active());

        fx.clock.advance(SessionPolicy::default().idle_timeout);
        let loaded = fx.gateway.load(record.session_id()).await.unwrap();
        assert_eq!(loaded.status(), SessionStatus::Terminated);
        assert!(fx.cache.peek(record.session_id()).await.is_none());
    }

    #[tokio::test]
    async fn idle_but_unswept_session_is_recached_from_store() {
        let fx = Fixture::new();
        let record = fx.seed("s1", "u1").await;
        fx.gateway.load(record.session_id()).await.unwrap();

        fx.clock
            .advance(SessionPolicy::default().idle_timeout + Duration::from_secs(1));
        let loaded = fx.gateway.load(record.session_id()).await.unwrap();

        assert!(loaded.is_active());
        assert_eq!(fx.cache.peek(record.session_id()).await, Some(loaded));
    }

    #[tokio::test(start_paused = true)]
    async fn reads_do_not_extend_cache_ttl() {
        let fx = Fixture::new();
        let record = fx.seed("s1", "u1").await;
        let ttl = SessionPolicy::default().cache_ttl;
        fx.gateway.load(record.session_id()).await.unwrap();

        tokio::time::advance(ttl - Duration::from_secs(10)).await;
        fx.gateway.load(record.session_id()).await.unwrap();
        tokio::time::advance(Duration::from_secs(20)).await;

        assert!(fx.cache.peek(record.session_id()).await.is_none());
    }
}
