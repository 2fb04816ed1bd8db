use chrono::{DateTime, Duration, Utc};

/// Wall clock used by the lesson services; fixed in tests so timers and bonus
/// tiers are deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }

    /// Whole seconds elapsed since `start`, clamped at zero when `start` lies
    /// in the future.
    #[must_use]
    pub fn elapsed_secs_since(&self, start: DateTime<Utc>) -> u64 {
        let secs = self.now().signed_duration_since(start).num_seconds();
        u64::try_from(secs).unwrap_or(0)
    }

    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self, Clock::Fixed(_))
    }
}

/// Millisecond timestamps are the persisted representation of course timers.
#[must_use]
pub fn to_unix_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

#[must_use]
pub fn from_unix_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_clamped_for_future_start() {
        let clock = fixed_clock();
        let start = fixed_now() + Duration::seconds(30);
        assert_eq!(clock.elapsed_secs_since(start), 0);
    }

    #[test]
    fn advancing_fixed_clock_moves_elapsed() {
        let mut clock = fixed_clock();
        clock.advance(Duration::seconds(1799));
        assert_eq!(clock.elapsed_secs_since(fixed_now()), 1799);
    }

    #[test]
    fn millis_round_trip_keeps_instant() {
        let millis = to_unix_millis(fixed_now());
        assert_eq!(from_unix_millis(millis), Some(fixed_now()));
    }
}
