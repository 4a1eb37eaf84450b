//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, enums, and error types
//! that form the vocabulary of the session domain.

mod errors;
mod ids;
mod session_status;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{SessionId, UserId};
pub use session_status::SessionStatus;
pub use timestamp::Timestamp;
