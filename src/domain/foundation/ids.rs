//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::ValidationError;

/// Identifier of a browsing session.
///
/// Session ids are usually supplied by the caller (e.g. a gateway cookie);
/// [`SessionId::generate`] produces one when none is supplied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a SessionId, returning error if empty or blank.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("session_id"));
        }
        Ok(Self(id))
    }

    /// Generates a fresh random SessionId.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owner of a session.
///
/// An empty UserId denotes an anonymous visitor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a UserId. Empty values are allowed and mean "anonymous".
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The anonymous user.
    pub fn anonymous() -> Self {
        Self(String::new())
    }

    /// Returns true for sessions without an owner.
    pub fn is_anonymous(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_rejects_blank() {
        assert!(SessionId::new("").is_err());
        assert!(SessionId::new("   ").is_err());
    }

    #[test]
    fn session_id_keeps_supplied_value() {
        let id = SessionId::new("sess-42").unwrap();
        assert_eq!(id.as_str(), "sess-42");
        assert_eq!(id.to_string(), "sess-42");
    }

    #[test]
    fn generated_session_ids_are_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn empty_user_id_is_anonymous() {
        assert!(UserId::new("").is_anonymous());
        assert!(UserId::anonymous().is_anonymous());
        assert!(!UserId::new("u1").is_anonymous());
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = SessionId::new("abc").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        let user: UserId = serde_json::from_str("\"u1\"").unwrap();
        assert_eq!(user.as_str(), "u1");
    }
}
