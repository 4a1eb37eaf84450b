//! Activity kinds reported by front-end tracking calls.

use std::fmt;
use std::str::FromStr;

use super::change::SessionChange;
use super::errors::SessionError;

/// Kind of tracked user activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    PageView,
    Click,
    Search,
    ProductView,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::PageView => "PAGE_VIEW",
            ActivityKind::Click => "CLICK",
            ActivityKind::Search => "SEARCH",
            ActivityKind::ProductView => "PRODUCT_VIEW",
        }
    }

    /// Builds the change recording this activity with its payload
    /// (page URL, element id, search term or product id).
    pub fn into_change(self, value: impl Into<String>) -> SessionChange {
        let value = value.into();
        match self {
            ActivityKind::PageView => SessionChange::PageView { url: value },
            ActivityKind::Click => SessionChange::Click { element_id: value },
            ActivityKind::Search => SessionChange::Search { term: value },
            ActivityKind::ProductView => SessionChange::ProductView { product_id: value },
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActivityKind {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PAGE_VIEW" => Ok(ActivityKind::PageView),
            "CLICK" => Ok(ActivityKind::Click),
            "SEARCH" => Ok(ActivityKind::Search),
            "PRODUCT_VIEW" => Ok(ActivityKind::ProductView),
            other => Err(SessionError::UnknownActivity(other.to_string())),
        }
    }
}
