//! TokenBinding - stores issued token pairs against sessions.
//!
//! Token issuance and verification policy live elsewhere; this component
//! only records which session a token belongs to and until when.

use tracing::{debug, info};

use crate::domain::foundation::{SessionId, Timestamp};
use crate::domain::session::{SessionChange, SessionError, SessionRecord};

use super::gateway::SessionGateway;

#[derive(Debug, Clone)]
pub struct TokenBinding {
    gateway: SessionGateway,
}

impl TokenBinding {
    pub fn new(gateway: SessionGateway) -> Self {
        Self { gateway }
    }

    /// Binds a token pair to an ACTIVE session and marks it authenticated.
    pub async fn set_tokens(
        &self,
        id: &SessionId,
        authentication_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: Timestamp,
    ) -> Result<SessionRecord, SessionError> {
        let authentication_token = non_blank("authentication_token", authentication_token)?;
        let refresh_token = non_blank("refresh_token", refresh_token)?;

        let record = self
            .gateway
            .mutate(
                id,
                SessionChange::BindTokens {
                    authentication_token,
                    refresh_token,
                    expires_at,
                },
            )
            .await?;

        info!(session_id = %id, user_id = %record.user_id(), "Tokens bound to session");
        Ok(record)
    }

    /// True iff a session owns `token` and the token has not yet expired.
    ///
    /// Read-only and independent of session status.
    pub async fn validate(&self, token: &str) -> Result<bool, SessionError> {
        if token.trim().is_empty() {
            return Ok(false);
        }
        let now = self.gateway.now();
        let valid = self
            .gateway
            .store()
            .find_by_authentication_token(token)
            .await?
            .is_some_and(|record| record.token_valid_at(now));

        debug!(valid, "Token validated");
        Ok(valid)
    }

    /// Replaces the authentication token and its expiry.
    ///
    /// Works on any ACTIVE session, including one already past its idle
    /// timeout but not yet swept; the refresh counts as activity.
    pub async fn refresh(
        &self,
        id: &SessionId,
        authentication_token: impl Into<String>,
        expires_at: Timestamp,
    ) -> Result<SessionRecord, SessionError> {
        let authentication_token = non_blank("authentication_token", authentication_token)?;

        let record = self
            .gateway
            .mutate(
                id,
                SessionChange::RefreshToken {
                    authentication_token,
                    expires_at,
                },
            )
            .await?;

        info!(session_id = %id, "Session token refreshed");
        Ok(record)
    }

    pub async fn find_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<SessionRecord>, SessionError> {
        if refresh_token.trim().is_empty() {
            return Ok(None);
        }
        Ok(self
            .gateway
            .store()
            .find_by_refresh_token(refresh_token)
            .await?)
    }
}

fn non_blank(field: &str, value: impl Into<String>) -> Result<String, SessionError> {
    let value = value.into();
    if value.trim().is_empty() {
        return Err(SessionError::validation(field, "must not be empty"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemorySessionCache, InMemoryUserSessionIndex, ManualClock};
    use crate::application::gateway::test_support::*;
    use crate::application::gateway::SessionPolicy;
    use crate::domain::foundation::SessionStatus;
    use std::sync::Arc;
    use std::time::Duration;

    fn tokens(fx: &Fixture) -> TokenBinding {
        TokenBinding::new(fx.gateway.clone())
    }

    #[tokio::test]
    async fn set_tokens_marks_session_authenticated() {
        let fx = Fixture::new();
        fx.seed("s1", "u1").await;

        let record = tokens(&fx)
            .set_tokens(&sid("s1"), "at-1", "rt-1", t0().plus_secs(600))
            .await
            .unwrap();

        assert!(record.is_authenticated());
        assert_eq!(record.authentication_token(), Some("at-1"));
        assert_eq!(record.refresh_token(), Some("rt-1"));
    }

    #[tokio::test]
    async fn validate_is_false_once_token_expires() {
        let fx = Fixture::new();
        fx.seed("s1", "u1").await;
        let tokens = tokens(&fx);
        tokens
            .set_tokens(&sid("s1"), "at-1", "rt-1", t0().plus_secs(60))
            .await
            .unwrap();

        assert!(tokens.validate("at-1").await.unwrap());

        fx.clock.advance(Duration::from_secs(60));
        assert!(!tokens.validate("at-1").await.unwrap());
    }

    #[tokio::test]
    async fn validate_unknown_token_is_false() {
        let fx = Fixture::new();
        assert!(!tokens(&fx).validate("nope").await.unwrap());
        assert!(!tokens(&fx).validate("").await.unwrap());
    }

    #[tokio::test]
    async fn validate_ignores_session_status() {
        let fx = Fixture::new();
        fx.seed("s1", "u1").await;
        let tokens = tokens(&fx);
        tokens
            .set_tokens(&sid("s1"), "at-1", "rt-1", t0().plus_secs(600))
            .await
            .unwrap();
        fx.gateway
            .apply(&sid("s1"), SessionChange::Terminate)
            .await
            .unwrap();

        assert!(tokens.validate("at-1").await.unwrap());
    }

    #[tokio::test]
    async fn refresh_replaces_token_and_touches() {
        let fx = Fixture::new();
        fx.seed("s1", "u1").await;
        let tokens = tokens(&fx);
        tokens
            .set_tokens(&sid("s1"), "at-1", "rt-1", t0().plus_secs(60))
            .await
            .unwrap();

        fx.clock.advance(Duration::from_secs(45 * 60));
        let record = tokens
            .refresh(&sid("s1"), "at-2", t0().plus_secs(45 * 60 + 600))
            .await
            .unwrap();

        assert_eq!(record.authentication_token(), Some("at-2"));
        assert_eq!(record.refresh_token(), Some("rt-1"));
        assert_eq!(record.last_activity_time(), t0().plus_secs(45 * 60));
        assert!(tokens.validate("at-2").await.unwrap());
        assert!(!tokens.validate("at-1").await.unwrap());
    }

    #[tokio::test]
    async fn refresh_on_closed_session_is_refused() {
        let fx = Fixture::new();
        fx.seed("s1", "u1").await;
        fx.gateway
            .apply(&sid("s1"), SessionChange::Terminate)
            .await
            .unwrap();

        let err = tokens(&fx)
            .refresh(&sid("s1"), "at-2", t0().plus_secs(60))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::closed(sid("s1"), SessionStatus::Terminated)
        );
    }

    #[tokio::test]
    async fn refresh_unknown_session_is_not_found() {
        let fx = Fixture::new();
        let err = tokens(&fx)
            .refresh(&sid("ghost"), "at", t0())
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::NotFound(sid("ghost")));
    }

    #[tokio::test]
    async fn blank_tokens_are_rejected() {
        let fx = Fixture::new();
        fx.seed("s1", "u1").await;
        let err = tokens(&fx)
            .set_tokens(&sid("s1"), " ", "rt", t0())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::ValidationFailed { .. }));
    }

    #[tokio::test]
    async fn find_by_refresh_token_locates_session() {
        let fx = Fixture::new();
        fx.seed("s1", "u1").await;
        let tokens = tokens(&fx);
        tokens
            .set_tokens(&sid("s1"), "at-1", "rt-1", t0().plus_secs(60))
            .await
            .unwrap();

        let found = tokens.find_by_refresh_token("rt-1").await.unwrap().unwrap();
        assert_eq!(found.session_id(), &sid("s1"));
        assert!(tokens.find_by_refresh_token("rt-x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn validate_surfaces_store_outage() {
        let gateway = SessionGateway::new(
            Arc::new(FailingStore),
            Arc::new(InMemorySessionCache::new()),
            Arc::new(InMemoryUserSessionIndex::new()),
            Arc::new(ManualClock::new(t0())),
            SessionPolicy::default(),
        );
        let err = TokenBinding::new(gateway).validate("at").await.unwrap_err();
        assert!(matches!(err, SessionError::BackendUnavailable(_)));
    }
}
