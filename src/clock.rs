use std::cell::Cell;

use chrono::{DateTime, Duration, Utc};

/// Source of "now" for every date comparison the ledger makes
pub trait Clock {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Used by the CLI's `--as-of` flag and by tests that need to step across
/// due dates deterministically.
#[derive(Debug, Clone)]
pub struct FixedClock {
    /// The instant reported by [`Clock::now`]
    instant: Cell<DateTime<Utc>>,
}

impl FixedClock {
    /// Create a clock frozen at `instant`
    #[must_use]
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self { instant: Cell::new(instant) }
    }

    /// Move the clock to `instant`
    pub fn set(&self, instant: DateTime<Utc>) {
        self.instant.set(instant);
    }

    /// Move the clock forward by `by`, saturating at the maximum representable instant
    pub fn advance(&self, by: Duration) {
        let current = self.instant.get();
        self.instant.set(current.checked_add_signed(by).unwrap_or(DateTime::<Utc>::MAX_UTC));
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.instant.get()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    #[allow(clippy::unwrap_used)]
    fn fixed_clock_only_moves_when_advanced() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::days(14));
        assert_eq!(clock.now(), Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap());

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn advance_saturates_instead_of_overflowing() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        clock.advance(Duration::MAX);
        assert_eq!(clock.now(), DateTime::<Utc>::MAX_UTC);
    }
}
