//! Error types for the domain layer.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::EmptyField { field } => field,
            ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

/// Error codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors
    ValidationFailed,

    // Not found errors
    SessionNotFound,

    // State errors
    SessionConflict,
    SessionClosed,

    // Infrastructure errors
    DatabaseError,
    CacheError,
    Timeout,
    SerializationError,
    InternalError,
}

impl ErrorCode {
    /// Infrastructure failures (transport, timeout, encoding).
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            ErrorCode::DatabaseError
                | ErrorCode::CacheError
                | ErrorCode::Timeout
                | ErrorCode::SerializationError
                | ErrorCode::InternalError
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::SessionNotFound => "SESSION_NOT_FOUND",
            ErrorCode::SessionConflict => "SESSION_CONFLICT",
            ErrorCode::SessionClosed => "SESSION_CLOSED",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::CacheError => "CACHE_ERROR",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::SerializationError => "SERIALIZATION_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Standard domain error with code, message, and optional details.
#[derive(Debug, Clone)]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Creates a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Creates a cache/index transport error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CacheError, message)
    }

    /// Creates a timeout error for an operation that exceeded its bound.
    pub fn timeout(operation: impl Into<String>) -> Self {
        let operation = operation.into();
        Self::new(ErrorCode::Timeout, format!("Timed out: {}", operation))
            .with_detail("operation", operation)
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for DomainError {}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::new(ErrorCode::SerializationError, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_empty_field_displays_correctly() {
        let err = ValidationError::empty_field("session_id");
        assert_eq!(format!("{}", err), "Field 'session_id' cannot be empty");
        assert_eq!(err.field(), "session_id");
    }

    #[test]
    fn domain_error_displays_code_and_message() {
        let err = DomainError::new(ErrorCode::SessionNotFound, "Session not found");
        assert_eq!(format!("{}", err), "[SESSION_NOT_FOUND] Session not found");
    }

    #[test]
    fn timeout_error_records_operation() {
        let err = DomainError::timeout("cache.get");
        assert_eq!(err.code, ErrorCode::Timeout);
        assert_eq!(err.details.get("operation"), Some(&"cache.get".to_string()));
    }

    #[test]
    fn infrastructure_codes_are_classified() {
        assert!(ErrorCode::DatabaseError.is_infrastructure());
        assert!(ErrorCode::Timeout.is_infrastructure());
        assert!(!ErrorCode::SessionClosed.is_infrastructure());
        assert!(!ErrorCode::SessionNotFound.is_infrastructure());
    }
}
