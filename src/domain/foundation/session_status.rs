//! SessionStatus enum for tracking the lifecycle of a browsing session.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a browsing session.
///
/// `Active` is the only non-terminal state. `Expired` and `Terminated`
/// are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    #[default]
    Active,
    Expired,
    Terminated,
}

impl SessionStatus {
    /// Returns true if the session can be modified.
    pub fn is_mutable(&self) -> bool {
        matches!(self, SessionStatus::Active)
    }

    /// Returns true for the absorbing states.
    pub fn is_terminal(&self) -> bool {
        !self.is_mutable()
    }

    /// Validates a transition from this status to another.
    ///
    /// Valid transitions:
    /// - Active -> Active (touch)
    /// - Active -> Expired
    /// - Active -> Terminated
    pub fn can_transition_to(&self, target: &SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, target),
            (Active, Active) | (Active, Expired) | (Active, Terminated)
        )
    }

    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "ACTIVE",
            SessionStatus::Expired => "EXPIRED",
            SessionStatus::Terminated => "TERMINATED",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(SessionStatus::Active),
            "EXPIRED" => Ok(SessionStatus::Expired),
            "TERMINATED" => Ok(SessionStatus::Terminated),
            other => Err(format!("Invalid session status: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_active() {
        assert_eq!(SessionStatus::default(), SessionStatus::Active);
    }

    #[test]
    fn only_active_is_mutable() {
        assert!(SessionStatus::Active.is_mutable());
        assert!(SessionStatus::Expired.is_terminal());
        assert!(SessionStatus::Terminated.is_terminal());
    }

    #[test]
    fn active_can_close_either_way() {
        assert!(SessionStatus::Active.can_transition_to(&SessionStatus::Expired));
        assert!(SessionStatus::Active.can_transition_to(&SessionStatus::Terminated));
    }

    #[test]
    fn terminal_states_are_absorbing() {
        for from in [SessionStatus::Expired, SessionStatus::Terminated] {
            for to in [
                SessionStatus::Active,
                SessionStatus::Expired,
                SessionStatus::Terminated,
            ] {
                assert!(!from.can_transition_to(&to));
            }
        }
    }

    #[test]
    fn storage_strings_roundtrip() {
        for status in [
            SessionStatus::Active,
            SessionStatus::Expired,
            SessionStatus::Terminated,
        ] {
            assert_eq!(status.as_str().parse::<SessionStatus>().unwrap(), status);
        }
        assert!("ARCHIVED".parse::<SessionStatus>().is_err());
    }

    #[test]
    fn serializes_to_upper_case_json() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Terminated).unwrap(),
            "\"TERMINATED\""
        );
        let status: SessionStatus = serde_json::from_str("\"EXPIRED\"").unwrap();
        assert_eq!(status, SessionStatus::Expired);
    }
}
