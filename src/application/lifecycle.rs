//! SessionLifecycleManager - create, end and touch sessions, plus the
//! read-side queries that span many records.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::str::FromStr;

use futures::future::join_all;
use tracing::{info, warn};

use crate::domain::foundation::{SessionId, SessionStatus, Timestamp, UserId};
use crate::domain::session::{
    ChangeOutcome, DeviceFilter, NewSession, RealTimeMetrics, SessionChange, SessionError,
    SessionRecord, SessionStatistics, UserSessionStatistics,
};

use super::gateway::SessionGateway;

/// Owns the create/end transitions and keeps store, cache and index in step.
#[derive(Debug, Clone)]
pub struct SessionLifecycleManager {
    gateway: SessionGateway,
}

impl SessionLifecycleManager {
    pub fn new(gateway: SessionGateway) -> Self {
        Self { gateway }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────────

    /// Opens a new ACTIVE session.
    ///
    /// Uses the requested id if present, otherwise generates one. Writes the
    /// store, then the cache, then the user's index entry.
    pub async fn create(&self, request: NewSession) -> Result<SessionRecord, SessionError> {
        let id = request.session_id.clone().unwrap_or_else(SessionId::generate);
        let record = SessionRecord::open(id.clone(), request, self.gateway.now());

        if !self.gateway.store().insert(&record).await? {
            return Err(SessionError::Conflict(id));
        }

        self.gateway.cache_put(&record).await;
        self.gateway.index_add(record.user_id(), &id).await;

        info!(
            session_id = %id,
            user_id = %record.user_id(),
            device_type = record.device_type().unwrap_or("-"),
            "Session created"
        );
        Ok(record)
    }

    pub async fn get(&self, id: &SessionId) -> Result<SessionRecord, SessionError> {
        self.gateway.load(id).await
    }

    /// Bumps the idle timer of an ACTIVE session.
    pub async fn touch(&self, id: &SessionId) -> Result<SessionRecord, SessionError> {
        self.gateway.mutate(id, SessionChange::Touch).await
    }

    /// Terminates a session.
    ///
    /// Ending an already-closed session returns it unchanged.
    pub async fn end(&self, id: &SessionId) -> Result<SessionRecord, SessionError> {
        let stored = self.gateway.apply(id, SessionChange::Terminate).await?;

        if stored.outcome == ChangeOutcome::Changed {
            info!(
                session_id = %id,
                user_id = %stored.record.user_id(),
                duration_seconds = stored.record.duration_seconds().unwrap_or_default(),
                "Session terminated"
            );
        }
        Ok(stored.record)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Listing
    // ─────────────────────────────────────────────────────────────────────────

    /// Active sessions of one user, most recently active first.
    ///
    /// The store's ACTIVE set is authoritative and the index is reconciled
    /// against it: live sessions missing from the index are re-added, and
    /// members that no longer resolve to an ACTIVE session of this user are
    /// evicted. Anonymous users and an unreachable index read the store only.
    pub async fn list_active_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SessionRecord>, SessionError> {
        let store = self.gateway.store();
        if user_id.is_anonymous() {
            return Ok(store.find_active_by_user_id(user_id).await?);
        }

        let (members, stored) = tokio::join!(
            self.gateway.index().members(user_id),
            store.find_active_by_user_id(user_id),
        );
        let mut active = stored?;

        let members = match members {
            Ok(members) => members,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "User session index unavailable, using store");
                active.sort_by_key(|r| Reverse(r.last_activity_time()));
                return Ok(active);
            }
        };

        let listed: HashSet<SessionId> = active.iter().map(|r| r.session_id().clone()).collect();
        for id in listed.difference(&members) {
            info!(user_id = %user_id, session_id = %id, "Restoring missing index entry");
            self.gateway.index_add(user_id, id).await;
        }

        // A member the store query missed may have been created after it ran.
        // Confirm against the store before evicting.
        let unlisted: Vec<SessionId> = members.difference(&listed).cloned().collect();
        let confirmed = join_all(unlisted.iter().map(|id| store.find_by_id(id))).await;
        for (id, result) in unlisted.iter().zip(confirmed) {
            match result? {
                Some(record) if record.is_active() && record.user_id() == user_id => {
                    active.push(record)
                }
                _ => {
                    info!(user_id = %user_id, session_id = %id, "Evicting stale index entry");
                    self.gateway.index_remove(user_id, id).await;
                }
            }
        }

        active.sort_by_key(|r| Reverse(r.last_activity_time()));
        Ok(active)
    }

    pub async fn list_all_active(&self) -> Result<Vec<SessionRecord>, SessionError> {
        self.find_by_status(SessionStatus::Active).await
    }

    /// Every session of the user, in any status.
    pub async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<SessionRecord>, SessionError> {
        Ok(self.gateway.store().find_by_user_id(user_id).await?)
    }

    pub async fn find_by_status(
        &self,
        status: SessionStatus,
    ) -> Result<Vec<SessionRecord>, SessionError> {
        Ok(self.gateway.store().find_by_status(status).await?)
    }

    /// Sessions whose last activity falls within `[start, end]`.
    pub async fn find_by_activity_range(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<SessionRecord>, SessionError> {
        if end.is_before(&start) {
            return Err(SessionError::validation(
                "end",
                "range end must not precede its start",
            ));
        }
        Ok(self
            .gateway
            .store()
            .find_by_activity_range(start, end)
            .await?)
    }

    /// Active sessions matching a device attribute.
    pub async fn find_active_by_device(
        &self,
        filter: &DeviceFilter,
    ) -> Result<Vec<SessionRecord>, SessionError> {
        if filter.value().trim().is_empty() {
            return Err(SessionError::validation(filter.column(), "must not be empty"));
        }
        Ok(self.gateway.store().find_active_by_device(filter).await?)
    }

    /// Parses a status name (`ACTIVE`, `EXPIRED`, `TERMINATED`) and lists
    /// sessions in that status.
    pub async fn find_by_status_name(
        &self,
        status: &str,
    ) -> Result<Vec<SessionRecord>, SessionError> {
        let status = SessionStatus::from_str(status)
            .map_err(|message| SessionError::validation("status", message))?;
        self.find_by_status(status).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statistics and repair
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn statistics(&self) -> Result<SessionStatistics, SessionError> {
        let store = self.gateway.store();
        Ok(SessionStatistics {
            active_count: store.count_active().await?,
            total_count: store.count_all().await?,
            by_device_type: store.count_active_by_device_type().await?,
        })
    }

    /// Live figures: active sessions, sessions started since midnight UTC,
    /// the mean length of today's closed sessions, and active sessions per
    /// device type.
    pub async fn real_time_metrics(&self) -> Result<RealTimeMetrics, SessionError> {
        let now = self.gateway.now();
        let store = self.gateway.store();
        let today = store.find_by_start_range(now.start_of_day(), now).await?;

        let durations: Vec<i64> = today.iter().filter_map(|r| r.duration_seconds()).collect();
        let average_session_duration_secs = (!durations.is_empty())
            .then(|| durations.iter().sum::<i64>() as f64 / durations.len() as f64);

        Ok(RealTimeMetrics {
            active_sessions: store.count_active().await?,
            sessions_started_today: today.len() as u64,
            average_session_duration_secs,
            active_by_device_type: store.count_active_by_device_type().await?,
        })
    }

    pub async fn user_statistics(
        &self,
        user_id: &UserId,
    ) -> Result<UserSessionStatistics, SessionError> {
        let sessions = self.gateway.store().find_by_user_id(user_id).await?;
        Ok(UserSessionStatistics {
            active_sessions: sessions.iter().filter(|r| r.is_active()).count() as u64,
            total_sessions: sessions.len() as u64,
        })
    }

    /// Rebuilds a user's index entries from the store.
    ///
    /// Adds every ACTIVE session and removes members that are not. Returns
    /// the number of active sessions now indexed. Listing performs the same
    /// repair; this entry point exists for operators and backfills.
    pub async fn rebuild_user_index(&self, user_id: &UserId) -> Result<usize, SessionError> {
        if user_id.is_anonymous() {
            return Ok(0);
        }

        let active = self.gateway.store().find_active_by_user_id(user_id).await?;
        for record in &active {
            self.gateway.index_add(user_id, record.session_id()).await;
        }

        if let Ok(members) = self.gateway.index().members(user_id).await {
            for id in members {
                if !active.iter().any(|r| r.session_id() == &id) {
                    self.gateway.index_remove(user_id, &id).await;
                }
            }
        }

        info!(user_id = %user_id, active = active.len(), "User session index rebuilt");
        Ok(active.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        InMemorySessionCache, InMemorySessionStore, InMemoryUserSessionIndex, ManualClock,
    };
    use crate::application::gateway::test_support::*;
    use crate::application::gateway::SessionPolicy;
    use crate::domain::foundation::DomainError;
    use crate::domain::session::UNKNOWN_DEVICE_TYPE;
    use crate::ports::{SessionStore, UserSessionIndex};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Index that rejects its first `add` and behaves afterwards.
    #[derive(Default)]
    struct FlakyIndex {
        inner: InMemoryUserSessionIndex,
        tripped: AtomicBool,
    }

    #[async_trait]
    impl UserSessionIndex for FlakyIndex {
        async fn add(&self, user_id: &UserId, id: &SessionId) -> Result<(), DomainError> {
            if !self.tripped.swap(true, Ordering::SeqCst) {
                return Err(DomainError::cache("connection reset"));
            }
            self.inner.add(user_id, id).await
        }
        async fn remove(&self, user_id: &UserId, id: &SessionId) -> Result<(), DomainError> {
            self.inner.remove(user_id, id).await
        }
        async fn members(&self, user_id: &UserId) -> Result<HashSet<SessionId>, DomainError> {
            self.inner.members(user_id).await
        }
    }

    fn manager(fx: &Fixture) -> SessionLifecycleManager {
        SessionLifecycleManager::new(fx.gateway.clone())
    }

    fn request(user: &str, id: &str) -> NewSession {
        NewSession::new(UserId::new(user), sid(id), "Mozilla/5.0", "192.168.1.10")
    }

    #[tokio::test]
    async fn create_initialises_active_record_and_indexes_it() {
        let fx = Fixture::new();
        let lifecycle = manager(&fx);

        let record = lifecycle.create(request("u1", "s1")).await.unwrap();

        assert_eq!(record.status(), SessionStatus::Active);
        assert_eq!(record.page_views(), 0);
        assert_eq!(record.start_time(), t0());
        assert_eq!(record.last_activity_time(), t0());
        assert!(fx.cache.peek(&sid("s1")).await.is_some());
        assert!(fx
            .index
            .members(&UserId::new("u1"))
            .await
            .unwrap()
            .contains(&sid("s1")));
    }

    #[tokio::test]
    async fn create_with_existing_id_conflicts() {
        let fx = Fixture::new();
        let lifecycle = manager(&fx);
        lifecycle.create(request("u1", "s1")).await.unwrap();

        let err = lifecycle.create(request("u2", "s1")).await.unwrap_err();
        assert_eq!(err, SessionError::Conflict(sid("s1")));
    }

    #[tokio::test]
    async fn create_without_id_generates_one() {
        let fx = Fixture::new();
        let lifecycle = manager(&fx);
        let mut req = request("u1", "ignored");
        req.session_id = None;

        let record = lifecycle.create(req).await.unwrap();
        assert_ne!(record.session_id(), &sid("ignored"));
    }

    #[tokio::test]
    async fn create_survives_index_outage() {
        let store = Arc::new(InMemorySessionStore::new());
        let gateway = SessionGateway::new(
            store.clone(),
            Arc::new(InMemorySessionCache::new()),
            Arc::new(FailingIndex),
            Arc::new(ManualClock::new(t0())),
            SessionPolicy::default(),
        );
        let lifecycle = SessionLifecycleManager::new(gateway);

        lifecycle.create(request("u1", "s1")).await.unwrap();

        // Listing falls back to the store while the index is down.
        let active = lifecycle
            .list_active_by_user(&UserId::new("u1"))
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn create_fails_when_store_down() {
        let gateway = SessionGateway::new(
            Arc::new(FailingStore),
            Arc::new(InMemorySessionCache::new()),
            Arc::new(FailingIndex),
            Arc::new(ManualClock::new(t0())),
            SessionPolicy::default(),
        );
        let err = SessionLifecycleManager::new(gateway)
            .create(request("u1", "s1"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn end_sets_duration_and_is_idempotent() {
        let fx = Fixture::new();
        let lifecycle = manager(&fx);
        lifecycle.create(request("u1", "s1")).await.unwrap();

        fx.clock.advance(Duration::from_secs(95));
        let first = lifecycle.end(&sid("s1")).await.unwrap();
        assert_eq!(first.status(), SessionStatus::Terminated);
        assert_eq!(first.duration_seconds(), Some(95));

        fx.clock.advance(Duration::from_secs(60));
        let second = lifecycle.end(&sid("s1")).await.unwrap();
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn end_unknown_session_is_not_found() {
        let fx = Fixture::new();
        let err = manager(&fx).end(&sid("ghost")).await.unwrap_err();
        assert_eq!(err, SessionError::NotFound(sid("ghost")));
    }

    #[tokio::test]
    async fn touch_moves_last_activity_forward() {
        let fx = Fixture::new();
        let lifecycle = manager(&fx);
        lifecycle.create(request("u1", "s1")).await.unwrap();

        fx.clock.advance(Duration::from_secs(10));
        let touched = lifecycle.touch(&sid("s1")).await.unwrap();
        assert_eq!(touched.last_activity_time(), t0().plus_secs(10));
    }

    #[tokio::test]
    async fn touch_on_ended_session_is_closed() {
        let fx = Fixture::new();
        let lifecycle = manager(&fx);
        lifecycle.create(request("u1", "s1")).await.unwrap();
        lifecycle.end(&sid("s1")).await.unwrap();

        let err = lifecycle.touch(&sid("s1")).await.unwrap_err();
        assert!(matches!(err, SessionError::Closed { .. }));
    }

    #[tokio::test]
    async fn list_active_by_user_evicts_stale_members() {
        let fx = Fixture::new();
        let lifecycle = manager(&fx);
        let user = UserId::new("u1");
        lifecycle.create(request("u1", "s1")).await.unwrap();
        lifecycle.create(request("u1", "s2")).await.unwrap();

        // Closed behind the index's back.
        fx.store
            .update(&sid("s2"), &SessionChange::Terminate, t0())
            .await
            .unwrap();
        fx.cache.set_online(false);

        let active = lifecycle.list_active_by_user(&user).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].session_id(), &sid("s1"));

        let members = fx.index.members(&user).await.unwrap();
        assert!(!members.contains(&sid("s2")));
    }

    #[tokio::test]
    async fn listing_restores_entry_lost_on_create() {
        let index = Arc::new(FlakyIndex::default());
        let gateway = SessionGateway::new(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(InMemorySessionCache::new()),
            index.clone(),
            Arc::new(ManualClock::new(t0())),
            SessionPolicy::default(),
        );
        let lifecycle = SessionLifecycleManager::new(gateway);
        let user = UserId::new("u1");

        lifecycle.create(request("u1", "s1")).await.unwrap();
        assert!(index.members(&user).await.unwrap().is_empty());

        let active = lifecycle.list_active_by_user(&user).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].session_id(), &sid("s1"));
        assert!(index.members(&user).await.unwrap().contains(&sid("s1")));
    }

    #[tokio::test]
    async fn listing_orders_by_most_recent_activity() {
        let fx = Fixture::new();
        let lifecycle = manager(&fx);
        lifecycle.create(request("u1", "s1")).await.unwrap();
        lifecycle.create(request("u1", "s2")).await.unwrap();
        fx.clock.advance(Duration::from_secs(5));
        lifecycle.touch(&sid("s1")).await.unwrap();

        let active = lifecycle.list_active_by_user(&UserId::new("u1")).await.unwrap();
        let ids: Vec<_> = active.iter().map(|r| r.session_id().clone()).collect();
        assert_eq!(ids, vec![sid("s1"), sid("s2")]);
    }

    #[tokio::test]
    async fn rebuild_user_index_restores_missing_entries() {
        let fx = Fixture::new();
        let lifecycle = manager(&fx);
        let user = UserId::new("u1");
        fx.seed("s1", "u1").await;
        fx.seed("s2", "u1").await;
        fx.index.add(&user, &sid("gone")).await.unwrap();

        let indexed = lifecycle.rebuild_user_index(&user).await.unwrap();

        assert_eq!(indexed, 2);
        let members = fx.index.members(&user).await.unwrap();
        assert_eq!(members.len(), 2);
        assert!(!members.contains(&sid("gone")));
    }

    #[tokio::test]
    async fn statistics_count_by_status_and_device() {
        let fx = Fixture::new();
        let lifecycle = manager(&fx);
        lifecycle
            .create(request("u1", "s1").with_device(Some("MOBILE".into()), None, None))
            .await
            .unwrap();
        lifecycle
            .create(request("u1", "s2").with_device(Some("DESKTOP".into()), None, None))
            .await
            .unwrap();
        lifecycle.create(request("u2", "s3")).await.unwrap();
        lifecycle.end(&sid("s2")).await.unwrap();

        let stats = lifecycle.statistics().await.unwrap();
        assert_eq!(stats.active_count, 2);
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.by_device_type.get("MOBILE"), Some(&1));
        assert_eq!(stats.by_device_type.get("DESKTOP"), None);

        let user = lifecycle.user_statistics(&UserId::new("u1")).await.unwrap();
        assert_eq!(user.active_sessions, 1);
        assert_eq!(user.total_sessions, 2);
    }

    #[tokio::test]
    async fn real_time_metrics_cover_today_only() {
        let fx = Fixture::new();
        let lifecycle = manager(&fx);

        fx.clock.set(t0().start_of_day().minus_secs(60));
        lifecycle.create(request("u1", "before-midnight")).await.unwrap();

        fx.clock.set(t0());
        lifecycle
            .create(request("u1", "s1").with_device(Some("MOBILE".into()), None, None))
            .await
            .unwrap();
        lifecycle.create(request("u2", "s2")).await.unwrap();
        fx.clock.advance(Duration::from_secs(120));
        lifecycle.end(&sid("s2")).await.unwrap();

        let metrics = lifecycle.real_time_metrics().await.unwrap();
        assert_eq!(metrics.active_sessions, 2);
        assert_eq!(metrics.sessions_started_today, 2);
        assert_eq!(metrics.average_session_duration_secs, Some(120.0));
        assert_eq!(metrics.active_by_device_type.get("MOBILE"), Some(&1));
        assert_eq!(
            metrics.active_by_device_type.get(UNKNOWN_DEVICE_TYPE),
            Some(&1)
        );
    }

    #[tokio::test]
    async fn real_time_metrics_without_closed_sessions_have_no_average() {
        let fx = Fixture::new();
        let lifecycle = manager(&fx);
        lifecycle.create(request("u1", "s1")).await.unwrap();

        let metrics = lifecycle.real_time_metrics().await.unwrap();
        assert_eq!(metrics.sessions_started_today, 1);
        assert_eq!(metrics.average_session_duration_secs, None);
    }

    #[tokio::test]
    async fn activity_range_rejects_inverted_bounds() {
        let fx = Fixture::new();
        let err = manager(&fx)
            .find_by_activity_range(t0().plus_secs(10), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::ValidationFailed { .. }));
    }

    #[tokio::test]
    async fn device_query_filters_active_sessions() {
        let fx = Fixture::new();
        let lifecycle = manager(&fx);
        lifecycle
            .create(request("u1", "s1").with_device(None, Some("Firefox".into()), None))
            .await
            .unwrap();
        lifecycle
            .create(request("u2", "s2").with_device(None, Some("Chrome".into()), None))
            .await
            .unwrap();

        let firefox = lifecycle
            .find_active_by_device(&DeviceFilter::Browser("Firefox".into()))
            .await
            .unwrap();
        assert_eq!(firefox.len(), 1);

        let by_ip = lifecycle
            .find_active_by_device(&DeviceFilter::IpAddress("192.168.1.10".into()))
            .await
            .unwrap();
        assert_eq!(by_ip.len(), 2);
    }

    #[tokio::test]
    async fn unknown_status_name_is_validation_error() {
        let fx = Fixture::new();
        let err = manager(&fx).find_by_status_name("PAUSED").await.unwrap_err();
        assert!(matches!(err, SessionError::ValidationFailed { .. }));
    }
}
