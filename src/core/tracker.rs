//! Edge detection and duration accounting for a single boolean signal.
//!
//! One [`SignalTracker`] type serves every tracked signal; the frame loop
//! owns one instance per [`Signal`]. A tracker is a two-state machine:
//!
//! ```text
//!            true (count += 1, since = now)
//!   ┌──────┐ ─────────────────────────────▶ ┌────────┐
//!   │ Idle │                                │ Active │
//!   └──────┘ ◀───────────────────────────── └────────┘
//!            false / finalize (total += now - since)
//! ```
//!
//! A missing observation (`None`) never moves the machine.

use crate::core::clock::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A tracked boolean condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// At least one hand is visible.
    Hand,
    /// A face is visible but not turned towards the camera.
    NotFacing,
    /// The body pose is classified as bad posture.
    BadPosture,
}

impl Signal {
    pub const ALL: [Signal; 3] = [Signal::Hand, Signal::NotFacing, Signal::BadPosture];

    pub fn name(self) -> &'static str {
        match self {
            Signal::Hand => "hand",
            Signal::NotFacing => "not_facing",
            Signal::BadPosture => "bad_posture",
        }
    }

    /// Position of this signal in [`Signal::ALL`].
    pub fn index(self) -> usize {
        match self {
            Signal::Hand => 0,
            Signal::NotFacing => 1,
            Signal::BadPosture => 2,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Current state of a tracker. The open interval's start lives inside
/// `Active`, so it exists exactly when the signal is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalState {
    Idle,
    Active { since: Timestamp },
}

/// Counters exposed for a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignalMetrics {
    /// Number of rising edges seen.
    pub transition_count: u64,
    /// Total length of all closed active intervals.
    #[serde(with = "secs_f64")]
    pub cumulative_active: Duration,
    /// Start of the currently open interval.
    pub active_since: Option<Timestamp>,
}

impl SignalMetrics {
    pub fn cumulative_active_secs(&self) -> f64 {
        self.cumulative_active.as_secs_f64()
    }
}

/// Result of feeding one observation to a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Update {
    pub presence: bool,
    pub transitioned: bool,
}

/// Running aggregates over a tracker's closed active intervals.
///
/// Fixed size however long the session runs. Mean and variance use
/// Welford's update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IntervalSummary {
    count: u64,
    total: Duration,
    longest: Duration,
    mean_secs: f64,
    m2: f64,
}

impl IntervalSummary {
    pub fn record(&mut self, interval: Duration) {
        self.count += 1;
        self.total = self.total.saturating_add(interval);
        self.longest = self.longest.max(interval);

        let x = interval.as_secs_f64();
        let delta = x - self.mean_secs;
        self.mean_secs += delta / self.count as f64;
        self.m2 += delta * (x - self.mean_secs);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn longest(&self) -> Duration {
        self.longest
    }

    pub fn mean_secs(&self) -> f64 {
        self.mean_secs
    }

    /// Sample standard deviation in seconds; zero with fewer than two intervals.
    pub fn std_dev_secs(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        (self.m2 / (self.count - 1) as f64).max(0.0).sqrt()
    }
}

/// Two-state edge detector and active-time accumulator.
#[derive(Debug, Clone)]
pub struct SignalTracker {
    signal: Signal,
    state: SignalState,
    transition_count: u64,
    cumulative_active: Duration,
    intervals: IntervalSummary,
    clock_anomalies: u64,
}

impl SignalTracker {
    pub fn new(signal: Signal) -> Self {
        Self {
            signal,
            state: SignalState::Idle,
            transition_count: 0,
            cumulative_active: Duration::ZERO,
            intervals: IntervalSummary::default(),
            clock_anomalies: 0,
        }
    }

    pub fn signal(&self) -> Signal {
        self.signal
    }

    pub fn state(&self) -> SignalState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SignalState::Active { .. })
    }

    /// Feed one frame's observation.
    ///
    /// `None` means the detector produced nothing this frame; the tracker
    /// keeps its current belief rather than treating it as `false`.
    pub fn update(&mut self, observation: Option<bool>, now: Timestamp) -> Update {
        let transitioned = match (observation, self.state) {
            (None, _) => false,
            (Some(true), SignalState::Idle) => {
                self.state = SignalState::Active { since: now };
                self.transition_count += 1;
                tracing::debug!(signal = %self.signal, count = self.transition_count, "signal became active");
                true
            }
            (Some(true), SignalState::Active { .. }) => false,
            (Some(false), SignalState::Active { since }) => {
                self.close_interval(since, now);
                true
            }
            (Some(false), SignalState::Idle) => false,
        };

        Update {
            presence: self.is_active(),
            transitioned,
        }
    }

    /// Close an interval left open at teardown.
    ///
    /// Returns the length credited to the cumulative total, or `None` if the
    /// signal was already idle.
    pub fn finalize(&mut self, now: Timestamp) -> Option<Duration> {
        match self.state {
            SignalState::Active { since } => Some(self.close_interval(since, now)),
            SignalState::Idle => None,
        }
    }

    pub fn metrics(&self) -> SignalMetrics {
        SignalMetrics {
            transition_count: self.transition_count,
            cumulative_active: self.cumulative_active,
            active_since: match self.state {
                SignalState::Active { since } => Some(since),
                SignalState::Idle => None,
            },
        }
    }

    /// Aggregates over every closed interval so far.
    pub fn intervals(&self) -> &IntervalSummary {
        &self.intervals
    }

    /// Number of times the clock was seen running backwards.
    pub fn clock_anomalies(&self) -> u64 {
        self.clock_anomalies
    }

    fn close_interval(&mut self, since: Timestamp, now: Timestamp) -> Duration {
        let delta = match now.checked_duration_since(since) {
            Some(delta) => delta,
            None => {
                self.clock_anomalies += 1;
                tracing::warn!(
                    signal = %self.signal,
                    since_ns = since.as_nanos(),
                    now_ns = now.as_nanos(),
                    "clock moved backwards, crediting zero duration"
                );
                Duration::ZERO
            }
        };

        self.cumulative_active = self.cumulative_active.saturating_add(delta);
        self.intervals.record(delta);
        self.state = SignalState::Idle;
        tracing::debug!(signal = %self.signal, interval_ms = delta.as_millis() as u64, "signal became idle");
        delta
    }
}

/// Serde support for durations as fractional seconds.
pub(crate) mod secs_f64 {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
