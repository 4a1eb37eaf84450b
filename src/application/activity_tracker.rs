//! ActivityTracker - records user activity against ACTIVE sessions.
//!
//! Every operation counts or stores its payload and bumps the idle timer in
//! one atomic store change. Closed sessions are refused.

use std::str::FromStr;

use tracing::debug;

use crate::domain::foundation::SessionId;
use crate::domain::session::{
    ActivityKind, AttributeBag, Attributes, SessionChange, SessionError, SessionRecord,
};

use super::gateway::SessionGateway;

#[derive(Debug, Clone)]
pub struct ActivityTracker {
    gateway: SessionGateway,
}

impl ActivityTracker {
    pub fn new(gateway: SessionGateway) -> Self {
        Self { gateway }
    }

    pub async fn track_page_view(
        &self,
        id: &SessionId,
        url: impl Into<String>,
    ) -> Result<SessionRecord, SessionError> {
        self.track(id, ActivityKind::PageView, url.into()).await
    }

    pub async fn track_click(
        &self,
        id: &SessionId,
        element_id: impl Into<String>,
    ) -> Result<SessionRecord, SessionError> {
        self.track(id, ActivityKind::Click, element_id.into()).await
    }

    pub async fn track_search(
        &self,
        id: &SessionId,
        term: impl Into<String>,
    ) -> Result<SessionRecord, SessionError> {
        self.track(id, ActivityKind::Search, term.into()).await
    }

    pub async fn track_product_view(
        &self,
        id: &SessionId,
        product_id: impl Into<String>,
    ) -> Result<SessionRecord, SessionError> {
        self.track(id, ActivityKind::ProductView, product_id.into()).await
    }

    /// Dispatches on an activity kind name such as `PAGE_VIEW` or `SEARCH`.
    pub async fn track_activity(
        &self,
        id: &SessionId,
        kind: &str,
        value: impl Into<String>,
    ) -> Result<SessionRecord, SessionError> {
        let kind = ActivityKind::from_str(kind)?;
        self.track(id, kind, value.into()).await
    }

    /// Sets the current page and referrer without counting a page view.
    pub async fn update_context(
        &self,
        id: &SessionId,
        current_page: impl Into<String>,
        referrer: Option<String>,
    ) -> Result<SessionRecord, SessionError> {
        let change = SessionChange::Context {
            current_page: current_page.into(),
            referrer,
        };
        self.gateway.mutate(id, change).await
    }

    pub async fn update_session_data(
        &self,
        id: &SessionId,
        values: Attributes,
    ) -> Result<SessionRecord, SessionError> {
        self.replace(id, AttributeBag::SessionData, values).await
    }

    pub async fn update_ai_context(
        &self,
        id: &SessionId,
        values: Attributes,
    ) -> Result<SessionRecord, SessionError> {
        self.replace(id, AttributeBag::AiContext, values).await
    }

    pub async fn update_recommendations(
        &self,
        id: &SessionId,
        values: Attributes,
    ) -> Result<SessionRecord, SessionError> {
        self.replace(id, AttributeBag::Recommendations, values).await
    }

    pub async fn update_user_preferences(
        &self,
        id: &SessionId,
        values: Attributes,
    ) -> Result<SessionRecord, SessionError> {
        self.replace(id, AttributeBag::UserPreferences, values).await
    }

    async fn track(
        &self,
        id: &SessionId,
        kind: ActivityKind,
        value: String,
    ) -> Result<SessionRecord, SessionError> {
        let record = self.gateway.mutate(id, kind.into_change(value)).await?;
        debug!(session_id = %id, activity = %kind, "Activity tracked");
        Ok(record)
    }

    async fn replace(
        &self,
        id: &SessionId,
        bag: AttributeBag,
        values: Attributes,
    ) -> Result<SessionRecord, SessionError> {
        let record = self
            .gateway
            .mutate(id, SessionChange::ReplaceAttributes { bag, values })
            .await?;
        debug!(session_id = %id, bag = bag.as_str(), "Session attributes replaced");
        Ok(record)
    }
}
