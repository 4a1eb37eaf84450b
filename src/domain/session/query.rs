//! Query filters and aggregate views over stored sessions.

use std::collections::BTreeMap;

use serde::Serialize;

use super::aggregate::SessionRecord;

/// Device-context filter for active-session queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceFilter {
    DeviceType(String),
    Browser(String),
    OperatingSystem(String),
    IpAddress(String),
}

impl DeviceFilter {
    /// Column holding the filtered attribute.
    pub fn column(&self) -> &'static str {
        match self {
            DeviceFilter::DeviceType(_) => "device_type",
            DeviceFilter::Browser(_) => "browser",
            DeviceFilter::OperatingSystem(_) => "operating_system",
            DeviceFilter::IpAddress(_) => "ip_address",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            DeviceFilter::DeviceType(v)
            | DeviceFilter::Browser(v)
            | DeviceFilter::OperatingSystem(v)
            | DeviceFilter::IpAddress(v) => v,
        }
    }

    /// Whether `record` carries the filtered value (status not considered).
    pub fn matches(&self, record: &SessionRecord) -> bool {
        match self {
            DeviceFilter::DeviceType(v) => record.device_type() == Some(v.as_str()),
            DeviceFilter::Browser(v) => record.browser() == Some(v.as_str()),
            DeviceFilter::OperatingSystem(v) => record.operating_system() == Some(v.as_str()),
            DeviceFilter::IpAddress(v) => record.ip_address() == v,
        }
    }
}

/// Device type bucket for sessions that never reported one.
pub const UNKNOWN_DEVICE_TYPE: &str = "UNKNOWN";

/// Platform-wide session statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatistics {
    pub active_count: u64,
    pub total_count: u64,
    /// Active sessions per device type.
    pub by_device_type: BTreeMap<String, u64>,
}

/// Session statistics for a single user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSessionStatistics {
    pub active_sessions: u64,
    pub total_sessions: u64,
}

/// Live dashboard figures at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealTimeMetrics {
    pub active_sessions: u64,
    /// Sessions started since midnight UTC, any status.
    pub sessions_started_today: u64,
    /// Mean length of today's sessions that have already closed.
    pub average_session_duration_secs: Option<f64>,
    pub active_by_device_type: BTreeMap<String, u64>,
}
