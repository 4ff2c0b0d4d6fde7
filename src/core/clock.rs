//! Monotonic time for duration accounting.
//!
//! Active intervals are measured on a monotonic clock so that wall-clock
//! adjustments can never shrink or inflate accumulated durations. The clock
//! is injected into the frame loop so tests can drive synthetic time.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Nanosecond-precision instant on a monotonic timeline.
///
/// The origin is the clock's own start (or zero for recorded sessions), never
/// the calendar epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp {
    nanos: u64,
}

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp { nanos: 0 };

    pub const fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    /// Saturates at the end of the timeline rather than wrapping.
    pub const fn from_millis(millis: u64) -> Self {
        Self {
            nanos: millis.saturating_mul(1_000_000),
        }
    }

    pub const fn as_nanos(self) -> u64 {
        self.nanos
    }

    pub fn as_secs_f64(self) -> f64 {
        self.nanos as f64 / 1e9
    }

    /// Time elapsed from `earlier` to `self`, or `None` if `earlier` is later.
    pub fn checked_duration_since(self, earlier: Timestamp) -> Option<Duration> {
        self.nanos
            .checked_sub(earlier.nanos)
            .map(Duration::from_nanos)
    }

    /// Time elapsed from `earlier` to `self`, clamped to zero.
    pub fn saturating_duration_since(self, earlier: Timestamp) -> Duration {
        self.checked_duration_since(earlier).unwrap_or_default()
    }

    pub fn saturating_add(self, duration: Duration) -> Self {
        let add = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        Self {
            nanos: self.nanos.saturating_add(add),
        }
    }
}

/// A source of monotonic timestamps.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Production clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        let elapsed = self.origin.elapsed();
        Timestamp::from_nanos(u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX))
    }
}

/// Manually driven clock for tests and recorded replays.
///
/// Clones share the same underlying time, so a test can keep a handle while
/// the frame loop owns another. Setting the time backwards is allowed on
/// purpose: it is how clock anomalies are simulated.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(at: Timestamp) -> Self {
        let clock = Self::new();
        clock.set(at);
        clock
    }

    pub fn set(&self, at: Timestamp) {
        self.nanos.store(at.as_nanos(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        let _ = self
            .nanos
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some(n.saturating_add(by))
            });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_conversions() {
        let ts = Timestamp::from_millis(1500);
        assert_eq!(ts.as_nanos(), 1_500_000_000);
        assert!((ts.as_secs_f64() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_from_millis_saturates_at_end_of_timeline() {
        // Largest value that still fits exactly.
        let max_exact = u64::MAX / 1_000_000;
        assert_eq!(
            Timestamp::from_millis(max_exact).as_nanos(),
            max_exact * 1_000_000
        );

        let beyond = Timestamp::from_millis(20_000_000_000_000);
        assert_eq!(beyond.as_nanos(), u64::MAX);
        assert_eq!(Timestamp::from_millis(u64::MAX), beyond);
        assert!(beyond > Timestamp::from_millis(max_exact));
    }

    #[test]
    fn test_manual_clock_advance_saturates() {
        let clock = ManualClock::starting_at(Timestamp::from_nanos(u64::MAX - 10));
        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now().as_nanos(), u64::MAX);
    }

    #[test]
    fn test_duration_since_clamps_backwards() {
        let earlier = Timestamp::from_millis(500);
        let later = Timestamp::from_millis(200);

        assert_eq!(later.checked_duration_since(earlier), None);
        assert_eq!(later.saturating_duration_since(earlier), Duration::ZERO);
        assert_eq!(
            earlier.saturating_duration_since(later),
            Duration::from_millis(300)
        );
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let handle = clock.clone();

        handle.advance(Duration::from_millis(100));
        assert_eq!(clock.now(), Timestamp::from_millis(100));

        handle.set(Timestamp::from_millis(40));
        assert_eq!(clock.now(), Timestamp::from_millis(40));
    }

    #[test]
    fn test_monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
