//! Conversion of raw perception frames into per-signal observations.
//!
//! This is the error boundary for classification: a detector failure or a
//! classifier error for one signal is logged here and turns into an absent
//! observation for that signal only.

use crate::config::SourceConfig;
use crate::core::classify::{Classifier, ClassifyError};
use crate::core::tracker::Signal;
use crate::source::types::{Detection, PerceptionFrame};

/// One frame's worth of observations.
///
/// `None` means "no new result this frame", which is different from `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObservationVector {
    /// Whether the face detector found a face
    pub face_detected: Option<bool>,
    /// Whether the pose detector found a body
    pub pose_detected: Option<bool>,
    /// At least one hand visible
    pub hand: Option<bool>,
    /// A face is visible and turned away from the camera
    pub not_facing: Option<bool>,
    /// The visible body is in a bad posture
    pub bad_posture: Option<bool>,
}

impl ObservationVector {
    /// A frame with no results at all.
    pub fn absent() -> Self {
        Self::default()
    }

    /// The observation feeding a given tracker.
    pub fn get(&self, signal: Signal) -> Option<bool> {
        match signal {
            Signal::Hand => self.hand,
            Signal::NotFacing => self.not_facing,
            Signal::BadPosture => self.bad_posture,
        }
    }
}

/// Why a signal was left absent for a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureCause {
    /// The detector itself reported a failure.
    Detector(String),
    /// The classifier could not judge the landmarks.
    Classifier(ClassifyError),
}

/// A signal whose observation was dropped this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationFailure {
    pub signal: Signal,
    pub cause: FailureCause,
}

/// Observations plus any per-signal failures encountered producing them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observed {
    pub vector: ObservationVector,
    pub failures: Vec<ObservationFailure>,
}

/// Turns [`PerceptionFrame`]s into [`ObservationVector`]s.
pub struct ObservationAdapter<K> {
    classifier: K,
    sources: SourceConfig,
}

impl<K: Classifier> ObservationAdapter<K> {
    pub fn new(classifier: K, sources: SourceConfig) -> Self {
        Self {
            classifier,
            sources,
        }
    }

    pub fn classifier(&self) -> &K {
        &self.classifier
    }

    pub fn sources(&self) -> SourceConfig {
        self.sources
    }

    /// Classify one frame. Each signal is handled independently so a failure
    /// in one never hides the others.
    pub fn observe(&self, frame: &PerceptionFrame) -> Observed {
        let mut observed = Observed::default();

        if self.sources.hand {
            if let Some(detection) = &frame.hand {
                match detection {
                    Detection::Detected { landmarks } => {
                        observed.vector.hand = Some(!landmarks.is_empty());
                    }
                    Detection::Failed { reason } => {
                        observed.record(Signal::Hand, FailureCause::Detector(reason.clone()));
                    }
                }
            }
        }

        if self.sources.face {
            if let Some(detection) = &frame.face {
                observed.vector.face_detected = detection.is_present();
                match detection {
                    // Facing is only judged when a face is actually visible.
                    Detection::Detected { landmarks } => {
                        if let Some(face) = landmarks.first() {
                            match self.classifier.is_facing_forward(face) {
                                Ok(forward) => observed.vector.not_facing = Some(!forward),
                                Err(e) => {
                                    observed.record(Signal::NotFacing, FailureCause::Classifier(e))
                                }
                            }
                        }
                    }
                    Detection::Failed { reason } => {
                        observed.record(Signal::NotFacing, FailureCause::Detector(reason.clone()));
                    }
                }
            }
        }

        if self.sources.pose {
            if let Some(detection) = &frame.pose {
                observed.vector.pose_detected = detection.is_present();
                match detection {
                    Detection::Detected { landmarks } => {
                        if let Some(pose) = landmarks.first() {
                            match self.classifier.is_bad_posture(pose) {
                                Ok(bad) => observed.vector.bad_posture = Some(bad),
                                Err(e) => {
                                    observed.record(Signal::BadPosture, FailureCause::Classifier(e))
                                }
                            }
                        }
                    }
                    Detection::Failed { reason } => {
                        observed.record(Signal::BadPosture, FailureCause::Detector(reason.clone()));
                    }
                }
            }
        }

        observed
    }
}

impl Observed {
    fn record(&mut self, signal: Signal, cause: FailureCause) {
        match &cause {
            FailureCause::Detector(reason) => {
                tracing::warn!(%signal, %reason, "detector failed, observation dropped");
            }
            // Occlusion is routine when someone leans out of frame.
            FailureCause::Classifier(e @ ClassifyError::Occluded { .. }) => {
                tracing::debug!(%signal, error = %e, "landmarks occluded, observation dropped");
            }
            FailureCause::Classifier(e) => {
                tracing::warn!(%signal, error = %e, "classification failed, observation dropped");
            }
        }
        self.failures.push(ObservationFailure { signal, cause });
    }
}
