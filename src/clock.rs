//! Wall-clock abstraction.
//!
//! The ledger never reads the system time directly: betting windows, bet
//! dates and entity ids all come from a [`Clock`], so tests can pin the time
//! of day with [`FixedClock`].

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use parking_lot::Mutex;

/// Source of local (timezone-naive) wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    /// Today's local calendar date.
    fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Epoch milliseconds, used for entity ids.
    fn now_millis(&self) -> i64 {
        self.now().and_utc().timestamp_millis()
    }
}

/// The machine's local clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock()
    }
}
