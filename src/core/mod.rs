//! Core functionality for the presence engine.
//!
//! This module contains:
//! - Signal trackers turning boolean observations into counts and durations
//! - Landmark classification for facing and posture
//! - The frame loop that drives trackers and publishes snapshots
//! - Snapshot and session report types for export

pub mod classify;
pub mod clock;
pub mod frame_loop;
pub mod observation;
pub mod snapshot;
pub mod tracker;

// Re-export commonly used types
pub use classify::{Classifier, ClassifierConfig, ClassifyError, GeometricClassifier, HeadPose};
pub use clock::{Clock, ManualClock, MonotonicClock, Timestamp};
pub use frame_loop::{EngineError, FrameLoop, StopReason};
pub use observation::{ObservationAdapter, ObservationVector, Observed};
pub use snapshot::{
    AnalyticsMetrics, IntervalStats, MetricsSnapshot, ReportBuilder, SessionReport, PRODUCER_NAME,
};
pub use tracker::{IntervalSummary, Signal, SignalMetrics, SignalState, SignalTracker, Update};
