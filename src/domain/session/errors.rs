//! Session-specific error types.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, SessionId, SessionStatus, ValidationError};

/// Errors surfaced to callers of the session core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Session id unknown to the durable store.
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    /// Create with an id that already exists.
    #[error("Session already exists: {0}")]
    Conflict(SessionId),

    /// Mutation attempted on an EXPIRED or TERMINATED session.
    #[error("Session {session_id} is closed ({status})")]
    Closed {
        session_id: SessionId,
        status: SessionStatus,
    },

    /// Durable store transport failure.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Caller input failed validation.
    #[error("Validation failed for '{field}': {message}")]
    ValidationFailed { field: String, message: String },

    /// Activity kind not recognised by the tracker.
    #[error("Unknown activity type: {0}")]
    UnknownActivity(String),
}

impl SessionError {
    pub fn closed(session_id: SessionId, status: SessionStatus) -> Self {
        SessionError::Closed { session_id, status }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        SessionError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Error code for logging and mapping at the edge.
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::NotFound(_) => ErrorCode::SessionNotFound,
            SessionError::Conflict(_) => ErrorCode::SessionConflict,
            SessionError::Closed { .. } => ErrorCode::SessionClosed,
            SessionError::BackendUnavailable(_) => ErrorCode::DatabaseError,
            SessionError::ValidationFailed { .. } | SessionError::UnknownActivity(_) => {
                ErrorCode::ValidationFailed
            }
        }
    }

    /// Domain-rule violations are deterministic and never retried.
    pub fn is_domain_rule(&self) -> bool {
        !matches!(self, SessionError::BackendUnavailable(_))
    }
}

impl From<DomainError> for SessionError {
    fn from(err: DomainError) -> Self {
        SessionError::BackendUnavailable(err.to_string())
    }
}

impl From<ValidationError> for SessionError {
    fn from(err: ValidationError) -> Self {
        SessionError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}
