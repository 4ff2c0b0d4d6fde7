//! Presence Engine - privacy-first hand, facing and posture tracking.
//!
//! This library turns per-frame perception results (face, hand and pose
//! landmarks from an external detector) into a small set of tracked signals:
//! whether a hand is visible, whether the user is facing away, and whether
//! their posture is bad. For each signal it keeps the current presence, how
//! many times it started, and how long it has been active in total.
//!
//! # Privacy Guarantees
//!
//! - **No images**: The engine never sees video frames, only landmarks
//! - **No landmark storage**: Landmarks are discarded after each frame
//! - **Aggregates only**: Reports contain counters and durations
//! - **Transparency**: Processing statistics are logged and auditable
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Presence Engine                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Source    │──▶│ Observation │──▶│  Trackers   │       │
//! │  │  (channel)  │   │  (classify) │   │  (x3)       │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         │                                    │              │
//! │         ▼                                    ▼              │
//! │  ┌─────────────┐                     ┌─────────────┐       │
//! │  │Transparency │                     │  Snapshot   │       │
//! │  │    Log      │                     │  (watch)    │       │
//! │  └─────────────┘                     └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use presence_engine::{Config, FrameLoop, GeometricClassifier, MonotonicClock};
//! use presence_engine::source::ChannelSource;
//! use std::sync::atomic::AtomicBool;
//!
//! let config = Config::default();
//! let mut frame_loop =
//!     FrameLoop::new(MonotonicClock::new(), GeometricClassifier::new(), &config)
//!         .expect("invalid configuration");
//!
//! let mut source = ChannelSource::new(config.channel_capacity);
//! let sender = source.sender().expect("source closed");
//! source.close();
//! // hand `sender` to the perception pipeline; dropping it ends the session
//! # drop(sender);
//!
//! let running = AtomicBool::new(true);
//! let (snapshot, _) = frame_loop.run(&mut source, &running).expect("source failed");
//! println!("{:?}", snapshot.analytics());
//! ```

pub mod config;
pub mod core;
pub mod source;
pub mod transparency;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError, SourceConfig};
pub use core::{
    AnalyticsMetrics, Classifier, Clock, EngineError, FrameLoop, GeometricClassifier,
    ManualClock, MetricsSnapshot, MonotonicClock, ReportBuilder, SessionReport, Signal,
    SignalMetrics, SignalTracker, Timestamp,
};
pub use source::{ChannelSource, FrameSender, PerceptionFrame, SourceError};
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Privacy declaration text.
pub const PRIVACY_DECLARATION: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║             PRESENCE ENGINE - PRIVACY DECLARATION                ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This engine tracks presence signals from camera landmarks.      ║
║                                                                  ║
║  ✓ WHAT WE KEEP:                                                 ║
║    • Whether a hand, face or body is currently visible           ║
║    • How many times each signal started                          ║
║    • How long each signal was active in total                    ║
║                                                                  ║
║  ✗ WHAT WE NEVER KEEP:                                           ║
║    • Video frames or images of any kind                          ║
║    • Face, hand or body landmark coordinates                     ║
║    • Anything that could identify who is in front of the camera  ║
║                                                                  ║
║  All processing is local. Landmarks are discarded as soon as     ║
║  each frame has been classified.                                 ║
║                                                                  ║
║  You can view processing statistics anytime with:                ║
║    presence-engine status                                        ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privacy_declaration_contents() {
        assert!(PRIVACY_DECLARATION.contains("PRIVACY"));
        assert!(PRIVACY_DECLARATION.contains("NEVER KEEP"));
        assert!(PRIVACY_DECLARATION.contains("Video frames"));
    }
}
