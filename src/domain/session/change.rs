//! Changes that can be applied to a SessionRecord.
//!
//! Every mutation of a stored session is expressed as a `SessionChange` so
//! that the durable store can apply it atomically under its own per-record
//! lock, instead of callers doing read-modify-write on a whole record.

use std::time::Duration;

use crate::domain::foundation::Timestamp;

use super::Attributes;

/// Which caller-owned key/value bag a replacement targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeBag {
    SessionData,
    AiContext,
    Recommendations,
    UserPreferences,
}

impl AttributeBag {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeBag::SessionData => "session_data",
            AttributeBag::AiContext => "ai_context",
            AttributeBag::Recommendations => "recommendations",
            AttributeBag::UserPreferences => "user_preferences",
        }
    }
}

/// A single mutation or transition of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionChange {
    /// Bump the idle timer only.
    Touch,
    PageView { url: String },
    Click { element_id: String },
    Search { term: String },
    ProductView { product_id: String },
    /// Navigation context without counting a page view.
    Context {
        current_page: String,
        referrer: Option<String>,
    },
    /// Wholesale replacement of one attribute bag.
    ReplaceAttributes { bag: AttributeBag, values: Attributes },
    BindTokens {
        authentication_token: String,
        refresh_token: String,
        expires_at: Timestamp,
    },
    RefreshToken {
        authentication_token: String,
        expires_at: Timestamp,
    },
    /// Explicit close (ACTIVE -> TERMINATED).
    Terminate,
    /// Idle-timeout close (ACTIVE -> EXPIRED), only if still idle.
    Expire { idle_timeout: Duration },
}

impl SessionChange {
    /// Short name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            SessionChange::Touch => "touch",
            SessionChange::PageView { .. } => "page_view",
            SessionChange::Click { .. } => "click",
            SessionChange::Search { .. } => "search",
            SessionChange::ProductView { .. } => "product_view",
            SessionChange::Context { .. } => "context",
            SessionChange::ReplaceAttributes { .. } => "replace_attributes",
            SessionChange::BindTokens { .. } => "bind_tokens",
            SessionChange::RefreshToken { .. } => "refresh_token",
            SessionChange::Terminate => "terminate",
            SessionChange::Expire { .. } => "expire",
        }
    }

    /// Whether this change closes the session.
    pub fn is_transition(&self) -> bool {
        matches!(self, SessionChange::Terminate | SessionChange::Expire { .. })
    }
}

/// Result of applying a change to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// The record was modified and must be persisted.
    Changed,
    /// Nothing to do (closing an already-closed or no-longer-idle session).
    Unchanged,
    /// Mutation refused because the session is EXPIRED or TERMINATED.
    Closed,
}
