//! Time source for idle bookkeeping and time-of-day greetings.

use std::sync::Mutex;

use chrono::{DateTime, Local, TimeDelta, Timelike, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current instant, used for idle comparisons and log timestamps.
    fn now(&self) -> DateTime<Utc>;

    /// Hour of day (0-23) in the store's local time zone.
    fn local_hour(&self) -> u32;
}

/// Wall clock of the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_hour(&self) -> u32 {
        Local::now().hour()
    }
}

/// Manually driven clock for tests and replays.
///
/// The local hour is taken from the stored instant as if UTC were local time.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().expect("mutex poisoned") = instant;
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().expect("mutex poisoned");
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("mutex poisoned")
    }

    fn local_hour(&self) -> u32 {
        self.now().hour()
    }
}
