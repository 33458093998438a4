//! Wall-clock sources.
//!
//! The engine never reads the system time directly. It asks a [`Clock`], so
//! tests can drive it with a [`ManualClock`] and no real waiting.

use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Duration, Utc};

/// Supplies "now" on demand.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same instant, so a test can keep one handle and give
/// another to the coordinator.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    /// Moves the clock forward by whole seconds.
    pub fn advance_secs(&self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.now.set(at);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Milliseconds from `from` to `to`, clamped at zero.
///
/// A clock that steps backwards yields an empty segment rather than a
/// negative one.
pub(crate) fn millis_between(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    u64::try_from((to - from).num_milliseconds()).unwrap_or(0)
}

/// Whole seconds in `millis`, rounded down.
pub(crate) const fn whole_secs(millis: u64) -> u64 {
    millis / 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(t0());
        let handle = clock.clone();
        handle.advance_secs(90);
        assert_eq!(clock.now(), t0() + Duration::seconds(90));
    }

    #[test]
    fn millis_keep_partial_seconds() {
        let later = t0() + Duration::milliseconds(2_999);
        assert_eq!(millis_between(t0(), later), 2_999);
        assert_eq!(whole_secs(millis_between(t0(), later)), 2);
    }

    #[test]
    fn millis_clamp_backwards_clock() {
        let earlier = t0() - Duration::seconds(5);
        assert_eq!(millis_between(t0(), earlier), 0);
    }
}
