//! Point-in-time views of the engine's signals.
//!
//! [`MetricsSnapshot`] is taken once per frame after every tracker has been
//! updated. [`AnalyticsMetrics`] flattens it into the field names analytics
//! consumers expect, and [`SessionReport`] is the end-of-session export.

use crate::core::clock::Timestamp;
use crate::core::tracker::{IntervalSummary, Signal, SignalMetrics, SignalTracker};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The name of this producer.
pub const PRODUCER_NAME: &str = "presence-engine";

/// Presence and counters for one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalReading {
    pub signal: Signal,
    pub presence: bool,
    pub metrics: SignalMetrics,
}

impl SignalReading {
    fn idle(signal: Signal) -> Self {
        Self {
            signal,
            presence: false,
            metrics: SignalMetrics::default(),
        }
    }

    fn from_tracker(tracker: &SignalTracker) -> Self {
        Self {
            signal: tracker.signal(),
            presence: tracker.is_active(),
            metrics: tracker.metrics(),
        }
    }
}

/// Immutable copy of every signal at the end of a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Number of frame iterations completed
    pub frame_index: u64,
    /// Monotonic time the frame was processed at
    pub taken_at: Timestamp,
    /// Face detector currently reports a face
    pub face_presence: bool,
    /// Pose detector currently reports a body
    pub pose_presence: bool,
    /// Readings indexed by [`Signal::index`]
    pub signals: [SignalReading; 3],
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self {
            frame_index: 0,
            taken_at: Timestamp::ZERO,
            face_presence: false,
            pose_presence: false,
            signals: Signal::ALL.map(SignalReading::idle),
        }
    }
}

impl MetricsSnapshot {
    /// Capture the current state of all trackers.
    pub fn capture(
        frame_index: u64,
        taken_at: Timestamp,
        face_presence: bool,
        pose_presence: bool,
        trackers: &[SignalTracker; 3],
    ) -> Self {
        Self {
            frame_index,
            taken_at,
            face_presence,
            pose_presence,
            signals: std::array::from_fn(|i| SignalReading::from_tracker(&trackers[i])),
        }
    }

    pub fn reading(&self, signal: Signal) -> &SignalReading {
        &self.signals[signal.index()]
    }

    pub fn metrics(&self, signal: Signal) -> &SignalMetrics {
        &self.reading(signal).metrics
    }

    pub fn presence(&self, signal: Signal) -> bool {
        self.reading(signal).presence
    }

    pub fn analytics(&self) -> AnalyticsMetrics {
        AnalyticsMetrics::from(self)
    }
}

/// Flat metrics record in the shape analytics consumers read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsMetrics {
    pub hand_presence: bool,
    pub face_presence: bool,
    pub pose_presence: bool,
    pub hand_detection_counter: u64,
    /// Seconds
    pub hand_detection_duration: f64,
    pub not_facing_counter: u64,
    /// Seconds
    pub not_facing_duration: f64,
    pub bad_posture_detection_counter: u64,
    /// Seconds
    pub bad_posture_duration: f64,
}

impl From<&MetricsSnapshot> for AnalyticsMetrics {
    fn from(snapshot: &MetricsSnapshot) -> Self {
        let hand = snapshot.metrics(Signal::Hand);
        let not_facing = snapshot.metrics(Signal::NotFacing);
        let bad_posture = snapshot.metrics(Signal::BadPosture);

        Self {
            hand_presence: snapshot.presence(Signal::Hand),
            face_presence: snapshot.face_presence,
            pose_presence: snapshot.pose_presence,
            hand_detection_counter: hand.transition_count,
            hand_detection_duration: hand.cumulative_active_secs(),
            not_facing_counter: not_facing.transition_count,
            not_facing_duration: not_facing.cumulative_active_secs(),
            bad_posture_detection_counter: bad_posture.transition_count,
            bad_posture_duration: bad_posture.cumulative_active_secs(),
        }
    }
}

/// Distribution of closed active intervals for one signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalStats {
    pub signal: Signal,
    pub count: u64,
    /// Seconds
    pub total: f64,
    pub mean: f64,
    pub max: f64,
    /// Sample standard deviation; zero with fewer than two intervals
    pub std_dev: f64,
}

impl IntervalStats {
    pub fn from_summary(signal: Signal, summary: &IntervalSummary) -> Self {
        Self {
            signal,
            count: summary.count(),
            total: summary.total().as_secs_f64(),
            mean: summary.mean_secs(),
            max: summary.longest().as_secs_f64(),
            std_dev: summary.std_dev_secs(),
        }
    }
}

/// End-of-session export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub producer: String,
    pub version: String,
    pub session_id: Uuid,
    pub device_id: String,
    pub started_at_utc: DateTime<Utc>,
    pub ended_at_utc: DateTime<Utc>,
    /// Monotonic session length in seconds
    pub duration_secs: f64,
    pub frames_processed: u64,
    pub metrics: AnalyticsMetrics,
    pub intervals: Vec<IntervalStats>,
}

impl SessionReport {
    /// Export file name: end time to the second, then the session id so
    /// reports finishing in the same second never collide.
    pub fn file_name(&self) -> String {
        format!(
            "session_{}_{}.json",
            self.ended_at_utc.format("%Y%m%d_%H%M%S"),
            self.session_id.simple()
        )
    }
}

/// Builder for [`SessionReport`]s sharing one session identity.
pub struct ReportBuilder {
    session_id: Uuid,
    device_id: String,
    started_at: DateTime<Utc>,
}

impl ReportBuilder {
    /// Start a new session identity stamped with the current wall-clock time.
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            device_id: device_id(),
            started_at: Utc::now(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Build a report from the final snapshot and the trackers' interval logs.
    pub fn build(&self, snapshot: &MetricsSnapshot, trackers: &[SignalTracker; 3]) -> SessionReport {
        SessionReport {
            producer: PRODUCER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            session_id: self.session_id,
            device_id: self.device_id.clone(),
            started_at_utc: self.started_at,
            ended_at_utc: Utc::now(),
            duration_secs: snapshot.taken_at.as_secs_f64(),
            frames_processed: snapshot.frame_index,
            metrics: snapshot.analytics(),
            intervals: trackers
                .iter()
                .map(|t| IntervalStats::from_summary(t.signal(), t.intervals()))
                .collect(),
        }
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Host name plus a short random suffix.
fn device_id() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown-host".to_string());
    format!("{}-{}", host, &Uuid::new_v4().simple().to_string()[..8])
}
