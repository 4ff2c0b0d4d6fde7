//! The per-frame driver.
//!
//! Each iteration classifies at most one frame, feeds every tracker, takes a
//! snapshot and publishes it. The loop owns all tracker state; consumers only
//! ever see published copies through a [`watch`] channel.
//!
//! Iterations never overlap, so a snapshot always reflects one fully applied
//! frame.

use crate::config::Config;
use crate::core::classify::Classifier;
use crate::core::clock::{Clock, Timestamp};
use crate::core::observation::{ObservationAdapter, ObservationVector, Observed};
use crate::core::snapshot::MetricsSnapshot;
use crate::core::tracker::{Signal, SignalTracker};
use crate::source::{ChannelSource, PerceptionFrame, SourceError};
use crate::transparency::{create_shared_log, SharedTransparencyLog};
use crossbeam_channel::RecvTimeoutError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

/// Errors that keep the engine from starting.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Frame source error: {0}")]
    Source(#[from] SourceError),
}

/// Why [`FrameLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The caller cleared the running flag.
    Cancelled,
    /// Every sender was dropped; the perception side ended the session.
    SourceClosed,
}

/// Drives the trackers at frame rate.
pub struct FrameLoop<C, K> {
    clock: C,
    adapter: ObservationAdapter<K>,
    trackers: [SignalTracker; 3],
    face_presence: bool,
    pose_presence: bool,
    frame_index: u64,
    frame_interval: Duration,
    last_tick: Option<Timestamp>,
    publisher: watch::Sender<MetricsSnapshot>,
    log: SharedTransparencyLog,
    finished: bool,
}

impl<C: Clock, K: Classifier> FrameLoop<C, K> {
    /// Create a loop with fresh trackers. Fails on configurations the loop
    /// cannot run with; nothing is published in that case.
    pub fn new(clock: C, classifier: K, config: &Config) -> Result<Self, EngineError> {
        config.validate()?;

        let (publisher, _) = watch::channel(MetricsSnapshot::default());

        Ok(Self {
            clock,
            adapter: ObservationAdapter::new(classifier, config.sources),
            trackers: Signal::ALL.map(SignalTracker::new),
            face_presence: false,
            pose_presence: false,
            frame_index: 0,
            frame_interval: config.frame_interval,
            last_tick: None,
            publisher,
            log: create_shared_log(),
            finished: false,
        })
    }

    /// Report statistics into a shared transparency log.
    pub fn with_transparency_log(mut self, log: SharedTransparencyLog) -> Self {
        self.log = log;
        self
    }

    /// New read-only view of the published snapshots.
    pub fn subscribe(&self) -> watch::Receiver<MetricsSnapshot> {
        self.publisher.subscribe()
    }

    /// Copy of the most recently published snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.publisher.borrow().clone()
    }

    pub fn trackers(&self) -> &[SignalTracker; 3] {
        &self.trackers
    }

    pub fn tracker(&self, signal: Signal) -> &SignalTracker {
        &self.trackers[signal.index()]
    }

    pub fn transparency_log(&self) -> &SharedTransparencyLog {
        &self.log
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Run one iteration at the clock's current time.
    ///
    /// `None` means no frame arrived this tick: every signal is absent.
    pub fn tick(&mut self, frame: Option<&PerceptionFrame>) -> MetricsSnapshot {
        let now = self.clock.now();
        self.tick_at(frame, now)
    }

    /// Run one iteration at an explicit time, used for recorded sessions.
    pub fn tick_at(&mut self, frame: Option<&PerceptionFrame>, now: Timestamp) -> MetricsSnapshot {
        if self.finished {
            tracing::debug!("tick after finish ignored");
            return self.snapshot();
        }

        let observed = match frame {
            Some(frame) => self.adapter.observe(frame),
            None => Observed::default(),
        };

        self.log.record_frame(frame.is_some());
        if !observed.failures.is_empty() {
            self.log
                .record_classification_failures(observed.failures.len() as u64);
        }

        self.apply(&observed.vector, now)
    }

    /// Feed an already classified observation vector.
    pub fn apply(&mut self, vector: &ObservationVector, now: Timestamp) -> MetricsSnapshot {
        if let Some(last) = self.last_tick {
            if now < last {
                self.log.record_clock_anomaly();
                tracing::warn!(
                    last_ns = last.as_nanos(),
                    now_ns = now.as_nanos(),
                    "frame timestamp went backwards"
                );
            }
        }
        self.last_tick = Some(now);

        for tracker in &mut self.trackers {
            let observation = vector.get(tracker.signal());
            tracker.update(observation, now);
        }
        if let Some(face) = vector.face_detected {
            self.face_presence = face;
        }
        if let Some(pose) = vector.pose_detected {
            self.pose_presence = pose;
        }

        self.frame_index += 1;
        self.publish(now)
    }

    /// Stop the loop, closing every open interval at the clock's current time.
    pub fn finish(&mut self) -> MetricsSnapshot {
        let now = self.clock.now();
        self.finish_at(now)
    }

    /// Stop the loop, closing every open interval at `now`.
    ///
    /// Calling this more than once is harmless; later calls return the final
    /// snapshot unchanged.
    pub fn finish_at(&mut self, now: Timestamp) -> MetricsSnapshot {
        if self.finished {
            return self.snapshot();
        }

        for tracker in &mut self.trackers {
            if let Some(closed) = tracker.finalize(now) {
                tracing::debug!(
                    signal = %tracker.signal(),
                    interval_ms = closed.as_millis() as u64,
                    "closed open interval at teardown"
                );
            }
        }
        self.finished = true;

        let snapshot = self.publish(now);
        tracing::info!(frames = self.frame_index, "frame loop finished");
        snapshot
    }

    /// Run a recorded session on its own capture times and finalize at the
    /// last one.
    ///
    /// Times are rebased to the first timestamped frame. A frame without a
    /// capture time reuses the previous frame's time.
    pub fn replay(&mut self, frames: &[PerceptionFrame]) -> MetricsSnapshot {
        let origin = frames
            .iter()
            .find_map(|f| f.captured_at_ms)
            .unwrap_or_default();

        let mut last = Timestamp::ZERO;
        for frame in frames {
            if let Some(captured) = frame.captured_at_ms {
                last = Timestamp::from_millis(captured.saturating_sub(origin));
            }
            self.tick_at(Some(frame), last);
        }
        tracing::debug!(frames = frames.len(), end_ns = last.as_nanos(), "replay complete");
        self.finish_at(last)
    }

    /// Drive the loop from a channel source until cancelled or the source
    /// closes, then finalize.
    ///
    /// Waits at most one frame interval for each frame; a tick without a
    /// frame is processed with every signal absent.
    pub fn run(
        &mut self,
        source: &mut ChannelSource,
        running: &AtomicBool,
    ) -> Result<(MetricsSnapshot, StopReason), EngineError> {
        if !source.is_running() {
            source.start()?;
        }
        tracing::info!(interval_ms = self.frame_interval.as_millis() as u64, "frame loop started");

        let receiver = source.receiver().clone();
        let reason = loop {
            if !running.load(Ordering::SeqCst) {
                break StopReason::Cancelled;
            }

            match receiver.recv_timeout(self.frame_interval) {
                Ok(frame) => {
                    self.tick(Some(&frame));
                }
                Err(RecvTimeoutError::Timeout) => {
                    self.tick(None);
                }
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::info!("frame source closed");
                    break StopReason::SourceClosed;
                }
            }
        };

        source.stop();
        Ok((self.finish(), reason))
    }

    fn publish(&mut self, now: Timestamp) -> MetricsSnapshot {
        let snapshot = MetricsSnapshot::capture(
            self.frame_index,
            now,
            self.face_presence,
            self.pose_presence,
            &self.trackers,
        );
        self.publisher.send_replace(snapshot.clone());
        snapshot
    }
}
