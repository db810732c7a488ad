//! Time source for entity timestamps.

use chrono::Local;

use crate::timestamp::Timestamp;

/// Source of the current wall-clock time.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// The local system clock.
///
/// Timestamps carry no timezone; they are whatever the local clock reports.
#[derive(Debug, Default, Copy, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_naive(Local::now().naive_local())
    }
}
