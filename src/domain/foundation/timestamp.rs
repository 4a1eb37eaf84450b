//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Returns the duration from another timestamp to this one.
    ///
    /// Returns negative duration if other is after self.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// Whole seconds elapsed from `other` to this timestamp.
    pub fn seconds_since(&self, other: &Timestamp) -> i64 {
        self.duration_since(other).num_seconds()
    }

    /// Creates a timestamp from Unix seconds.
    ///
    /// Out-of-range values clamp to the Unix epoch.
    pub fn from_unix_secs(secs: u64) -> Self {
        Self(DateTime::<Utc>::from_timestamp(secs as i64, 0).unwrap_or_default())
    }

    /// Returns the timestamp as Unix seconds.
    pub fn as_unix_secs(&self) -> u64 {
        self.0.timestamp().max(0) as u64
    }

    /// Creates a new timestamp by adding the specified number of seconds.
    pub fn plus_secs(&self, secs: u64) -> Self {
        Self(self.0 + Duration::seconds(secs as i64))
    }

    /// Creates a new timestamp by subtracting the specified number of seconds.
    pub fn minus_secs(&self, secs: u64) -> Self {
        Self(self.0 - Duration::seconds(secs as i64))
    }

    /// Midnight UTC of the same calendar day.
    pub fn start_of_day(&self) -> Self {
        let secs = self.as_unix_secs();
        Self::from_unix_secs(secs - secs % 86_400)
    }

    /// Adds a std duration (used for idle-timeout arithmetic).
    pub fn plus(&self, duration: std::time::Duration) -> Self {
        Self(self.0 + Duration::from_std(duration).unwrap_or(Duration::zero()))
    }

    /// Subtracts a std duration (used for sweep cutoffs).
    pub fn minus(&self, duration: std::time::Duration) -> Self {
        Self(self.0 - Duration::from_std(duration).unwrap_or(Duration::zero()))
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn timestamp_from_datetime_preserves_value() {
        let dt = Utc::now();
        let ts = Timestamp::from_datetime(dt);
        assert_eq!(ts.as_datetime(), &dt);
    }

    #[test]
    fn ordering_helpers_agree() {
        let ts1 = Timestamp::from_unix_secs(1000);
        let ts2 = ts1.plus_secs(1);

        assert!(ts1.is_before(&ts2));
        assert!(ts2.is_after(&ts1));
        assert!(ts1 < ts2);
    }

    #[test]
    fn timestamp_serializes_as_rfc3339() {
        let dt = DateTime::parse_from_rfc3339("2024-01-15T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let json = serde_json::to_string(&Timestamp::from_datetime(dt)).unwrap();
        assert!(json.contains("2024-01-15"));
    }

    #[test]
    fn from_unix_secs_works() {
        // 2024-01-15T00:00:00Z
        let ts = Timestamp::from_unix_secs(1705276800);
        assert_eq!(ts.as_datetime().year(), 2024);
        assert_eq!(ts.as_unix_secs(), 1705276800);
    }

    #[test]
    fn seconds_since_counts_whole_seconds() {
        let start = Timestamp::from_unix_secs(1000);
        let end = start.plus_secs(90);
        assert_eq!(end.seconds_since(&start), 90);
        assert_eq!(start.seconds_since(&end), -90);
    }

    #[test]
    fn start_of_day_truncates_to_utc_midnight() {
        // 2023-11-14T22:13:20Z
        let ts = Timestamp::from_unix_secs(1_700_000_000);
        let midnight = ts.start_of_day();
        assert_eq!(midnight.as_unix_secs(), 1_699_920_000);
        assert_eq!(midnight.as_datetime().day(), ts.as_datetime().day());
        assert_eq!(midnight.start_of_day(), midnight);
    }

    #[test]
    fn std_duration_arithmetic() {
        let ts = Timestamp::from_unix_secs(10_000);
        let idle = std::time::Duration::from_secs(1800);
        assert_eq!(ts.plus(idle).as_unix_secs(), 11_800);
        assert_eq!(ts.minus(idle).as_unix_secs(), 8_200);
    }
}
