//! SessionService - the interface calling code uses.
//!
//! A thin facade over the lifecycle manager, activity tracker and token
//! binding, all sharing one [`SessionGateway`].

use std::sync::Arc;

use crate::domain::foundation::{SessionId, SessionStatus, Timestamp, UserId};
use crate::domain::session::{
    Attributes, DeviceFilter, NewSession, RealTimeMetrics, SessionError, SessionRecord,
    SessionStatistics, UserSessionStatistics,
};
use crate::ports::{Clock, SessionCache, SessionStore, UserSessionIndex};

use super::activity_tracker::ActivityTracker;
use super::expiration_sweeper::{ExpirationSweeper, ExpirationSweeperConfig};
use super::gateway::{SessionGateway, SessionPolicy};
use super::lifecycle::SessionLifecycleManager;
use super::token_binding::TokenBinding;

#[derive(Debug, Clone)]
pub struct SessionService {
    gateway: SessionGateway,
    lifecycle: SessionLifecycleManager,
    activity: ActivityTracker,
    tokens: TokenBinding,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        cache: Arc<dyn SessionCache>,
        index: Arc<dyn UserSessionIndex>,
        clock: Arc<dyn Clock>,
        policy: SessionPolicy,
    ) -> Self {
        Self::from_gateway(SessionGateway::new(store, cache, index, clock, policy))
    }

    pub fn from_gateway(gateway: SessionGateway) -> Self {
        Self {
            lifecycle: SessionLifecycleManager::new(gateway.clone()),
            activity: ActivityTracker::new(gateway.clone()),
            tokens: TokenBinding::new(gateway.clone()),
            gateway,
        }
    }

    /// A sweeper sharing this service's backends and policy.
    pub fn sweeper(&self, config: ExpirationSweeperConfig) -> ExpirationSweeper {
        ExpirationSweeper::with_config(self.gateway.clone(), config)
    }

    pub fn lifecycle(&self) -> &SessionLifecycleManager {
        &self.lifecycle
    }

    pub fn activity(&self) -> &ActivityTracker {
        &self.activity
    }

    pub fn tokens(&self) -> &TokenBinding {
        &self.tokens
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Opens a session with the minimal create arguments.
    pub async fn create_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
        user_agent: impl Into<String>,
        ip_address: impl Into<String>,
    ) -> Result<SessionRecord, SessionError> {
        self.lifecycle
            .create(NewSession::new(user_id, session_id, user_agent, ip_address))
            .await
    }

    /// Opens a session from a full request (device context, initial data).
    pub async fn open_session(&self, request: NewSession) -> Result<SessionRecord, SessionError> {
        self.lifecycle.create(request).await
    }

    pub async fn get_session(&self, id: &SessionId) -> Result<SessionRecord, SessionError> {
        self.lifecycle.get(id).await
    }

    pub async fn touch(&self, id: &SessionId) -> Result<SessionRecord, SessionError> {
        self.lifecycle.touch(id).await
    }

    pub async fn end_session(&self, id: &SessionId) -> Result<SessionRecord, SessionError> {
        self.lifecycle.end(id).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Activity
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn track_page_view(
        &self,
        id: &SessionId,
        url: impl Into<String>,
    ) -> Result<SessionRecord, SessionError> {
        self.activity.track_page_view(id, url).await
    }

    pub async fn track_click(
        &self,
        id: &SessionId,
        element_id: impl Into<String>,
    ) -> Result<SessionRecord, SessionError> {
        self.activity.track_click(id, element_id).await
    }

    pub async fn track_search(
        &self,
        id: &SessionId,
        term: impl Into<String>,
    ) -> Result<SessionRecord, SessionError> {
        self.activity.track_search(id, term).await
    }

    pub async fn track_product_view(
        &self,
        id: &SessionId,
        product_id: impl Into<String>,
    ) -> Result<SessionRecord, SessionError> {
        self.activity.track_product_view(id, product_id).await
    }

    pub async fn track_activity(
        &self,
        id: &SessionId,
        kind: &str,
        value: impl Into<String>,
    ) -> Result<SessionRecord, SessionError> {
        self.activity.track_activity(id, kind, value).await
    }

    pub async fn update_context(
        &self,
        id: &SessionId,
        current_page: impl Into<String>,
        referrer: Option<String>,
    ) -> Result<SessionRecord, SessionError> {
        self.activity.update_context(id, current_page, referrer).await
    }

    pub async fn update_session_data(
        &self,
        id: &SessionId,
        values: Attributes,
    ) -> Result<SessionRecord, SessionError> {
        self.activity.update_session_data(id, values).await
    }

    pub async fn update_ai_context(
        &self,
        id: &SessionId,
        values: Attributes,
    ) -> Result<SessionRecord, SessionError> {
        self.activity.update_ai_context(id, values).await
    }

    pub async fn update_recommendations(
        &self,
        id: &SessionId,
        values: Attributes,
    ) -> Result<SessionRecord, SessionError> {
        self.activity.update_recommendations(id, values).await
    }

    pub async fn update_user_preferences(
        &self,
        id: &SessionId,
        values: Attributes,
    ) -> Result<SessionRecord, SessionError> {
        self.activity.update_user_preferences(id, values).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tokens
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn set_tokens(
        &self,
        id: &SessionId,
        authentication_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: Timestamp,
    ) -> Result<SessionRecord, SessionError> {
        self.tokens
            .set_tokens(id, authentication_token, refresh_token, expires_at)
            .await
    }

    pub async fn validate_token(&self, token: &str) -> Result<bool, SessionError> {
        self.tokens.validate(token).await
    }

    pub async fn refresh_token(
        &self,
        id: &SessionId,
        authentication_token: impl Into<String>,
        expires_at: Timestamp,
    ) -> Result<SessionRecord, SessionError> {
        self.tokens.refresh(id, authentication_token, expires_at).await
    }

    pub async fn find_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<SessionRecord>, SessionError> {
        self.tokens.find_by_refresh_token(refresh_token).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn list_active_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SessionRecord>, SessionError> {
        self.lifecycle.list_active_by_user(user_id).await
    }

    pub async fn list_all_active(&self) -> Result<Vec<SessionRecord>, SessionError> {
        self.lifecycle.list_all_active().await
    }

    pub async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<SessionRecord>, SessionError> {
        self.lifecycle.list_by_user(user_id).await
    }

    pub async fn find_by_status(
        &self,
        status: SessionStatus,
    ) -> Result<Vec<SessionRecord>, SessionError> {
        self.lifecycle.find_by_status(status).await
    }

    pub async fn find_by_activity_range(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<SessionRecord>, SessionError> {
        self.lifecycle.find_by_activity_range(start, end).await
    }

    pub async fn find_by_device_type(
        &self,
        device_type: impl Into<String>,
    ) -> Result<Vec<SessionRecord>, SessionError> {
        self.lifecycle
            .find_active_by_device(&DeviceFilter::DeviceType(device_type.into()))
            .await
    }

    pub async fn find_by_browser(
        &self,
        browser: impl Into<String>,
    ) -> Result<Vec<SessionRecord>, SessionError> {
        self.lifecycle
            .find_active_by_device(&DeviceFilter::Browser(browser.into()))
            .await
    }

    pub async fn find_by_operating_system(
        &self,
        operating_system: impl Into<String>,
    ) -> Result<Vec<SessionRecord>, SessionError> {
        self.lifecycle
            .find_active_by_device(&DeviceFilter::OperatingSystem(operating_system.into()))
            .await
    }

    pub async fn find_by_ip_address(
        &self,
        ip_address: impl Into<String>,
    ) -> Result<Vec<SessionRecord>, SessionError> {
        self.lifecycle
            .find_active_by_device(&DeviceFilter::IpAddress(ip_address.into()))
            .await
    }

    pub async fn statistics(&self) -> Result<SessionStatistics, SessionError> {
        self.lifecycle.statistics().await
    }

    pub async fn real_time_metrics(&self) -> Result<RealTimeMetrics, SessionError> {
        self.lifecycle.real_time_metrics().await
    }

    pub async fn user_statistics(
        &self,
        user_id: &UserId,
    ) -> Result<UserSessionStatistics, SessionError> {
        self.lifecycle.user_statistics(user_id).await
    }

    pub async fn rebuild_user_index(&self, user_id: &UserId) -> Result<usize, SessionError> {
        self.lifecycle.rebuild_user_index(user_id).await
    }
}
