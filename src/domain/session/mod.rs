//! Session domain module.
//!
//! A session is one browsing visit: created ACTIVE, mutated by activity
//! tracking and token binding, and closed either explicitly (TERMINATED)
//! or by the idle-timeout sweep (EXPIRED). Closed sessions are retained
//! for audit and never mutated again.

mod activity;
mod aggregate;
mod change;
mod errors;
mod query;

pub use activity::ActivityKind;
pub use aggregate::{Attributes, NewSession, SessionRecord};
pub use change::{AttributeBag, ChangeOutcome, SessionChange};
pub use errors::SessionError;
pub use query::{
    DeviceFilter, RealTimeMetrics, SessionStatistics, UserSessionStatistics, UNKNOWN_DEVICE_TYPE,
};
