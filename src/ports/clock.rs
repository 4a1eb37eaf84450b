//! Clock port - source of "now" for timestamps and sweep cutoffs.

use crate::domain::foundation::Timestamp;

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}
