//! Landmark classifiers.
//!
//! Turns one landmark set into a boolean the trackers can consume. The engine
//! only depends on the [`Classifier`] trait; [`GeometricClassifier`] is the
//! default implementation working on MediaPipe face mesh and pose topologies.

use crate::source::types::Landmark;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Face mesh indices
const NOSE_TIP: usize = 4;
const NOSE_BRIDGE: usize = 6;
const FOREHEAD: usize = 10;
const CHIN: usize = 152;
const LEFT_CHEEK: usize = 234;
const RIGHT_CHEEK: usize = 454;

// Pose indices
const LEFT_EAR: usize = 7;
const RIGHT_EAR: usize = 8;
const LEFT_SHOULDER: usize = 11;
const RIGHT_SHOULDER: usize = 12;

/// Below this span (normalized units) the geometry is too small to measure.
const MIN_SPAN: f64 = 0.01;

/// Errors raised while classifying a single landmark set.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifyError {
    #[error("Expected at least {expected} landmarks, got {actual}")]
    InsufficientLandmarks { expected: usize, actual: usize },

    #[error("Landmark {index} not visible enough ({visibility:.2})")]
    Occluded { index: usize, visibility: f64 },

    #[error("Degenerate geometry: {0}")]
    Degenerate(&'static str),
}

/// Boolean predicates over landmark sets.
pub trait Classifier {
    /// Whether the face is turned towards the camera.
    fn is_facing_forward(&self, face: &[Landmark]) -> Result<bool, ClassifyError>;

    /// Whether the body pose indicates bad posture.
    fn is_bad_posture(&self, pose: &[Landmark]) -> Result<bool, ClassifyError>;
}

/// Thresholds for [`GeometricClassifier`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Maximum head yaw still counted as facing forward (degrees)
    pub max_yaw_deg: f64,
    /// Maximum head pitch still counted as facing forward (degrees)
    pub max_pitch_deg: f64,
    /// Shoulder height difference relative to shoulder width
    pub max_shoulder_tilt: f64,
    /// Minimum ear-to-shoulder height relative to shoulder width
    pub min_neck_ratio: f64,
    /// Pose landmarks below this visibility are treated as occluded
    pub min_visibility: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_yaw_deg: 20.0,
            max_pitch_deg: 15.0,
            max_shoulder_tilt: 0.12,
            min_neck_ratio: 0.35,
            min_visibility: 0.5,
        }
    }
}

/// Head pose estimate derived from face mesh proportions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadPose {
    /// Negative = turned left, positive = turned right (degrees)
    pub yaw: f64,
    /// Negative = tilted up, positive = tilted down (degrees)
    pub pitch: f64,
}

/// Default classifier based on landmark proportions.
#[derive(Debug, Clone, Default)]
pub struct GeometricClassifier {
    config: ClassifierConfig,
}

impl GeometricClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Estimate yaw from nose-to-cheek asymmetry and pitch from the split of
    /// face height above and below the nose bridge.
    pub fn head_pose(&self, face: &[Landmark]) -> Result<HeadPose, ClassifyError> {
        require_len(face, RIGHT_CHEEK + 1)?;

        let nose = &face[NOSE_TIP];
        let left_dist = nose.distance_2d(&face[LEFT_CHEEK]);
        let right_dist = nose.distance_2d(&face[RIGHT_CHEEK]);
        if left_dist + right_dist < MIN_SPAN {
            return Err(ClassifyError::Degenerate("cheeks collapse onto nose"));
        }
        let yaw = (right_dist - left_dist) / (left_dist + right_dist) * 45.0;

        let bridge = &face[NOSE_BRIDGE];
        let upper = bridge.distance_2d(&face[FOREHEAD]);
        let lower = face[CHIN].distance_2d(bridge);
        if upper + lower < MIN_SPAN {
            return Err(ClassifyError::Degenerate("face height too small"));
        }
        // A neutral face splits roughly one third above the bridge, two below.
        let pitch = ((lower - upper) / (upper + lower) - 1.0 / 3.0) * 30.0;

        Ok(HeadPose { yaw, pitch })
    }

    fn visible<'a>(&self, pose: &'a [Landmark], index: usize) -> Result<&'a Landmark, ClassifyError> {
        let landmark = &pose[index];
        if landmark.visibility < self.config.min_visibility {
            return Err(ClassifyError::Occluded {
                index,
                visibility: landmark.visibility,
            });
        }
        Ok(landmark)
    }
}

impl Classifier for GeometricClassifier {
    fn is_facing_forward(&self, face: &[Landmark]) -> Result<bool, ClassifyError> {
        let pose = self.head_pose(face)?;
        Ok(pose.yaw.abs() <= self.config.max_yaw_deg && pose.pitch.abs() <= self.config.max_pitch_deg)
    }

    fn is_bad_posture(&self, pose: &[Landmark]) -> Result<bool, ClassifyError> {
        require_len(pose, RIGHT_SHOULDER + 1)?;

        let left_shoulder = self.visible(pose, LEFT_SHOULDER)?;
        let right_shoulder = self.visible(pose, RIGHT_SHOULDER)?;
        let left_ear = self.visible(pose, LEFT_EAR)?;
        let right_ear = self.visible(pose, RIGHT_EAR)?;

        let shoulder_width = left_shoulder.distance_2d(right_shoulder);
        if shoulder_width < MIN_SPAN {
            return Err(ClassifyError::Degenerate("shoulders overlap"));
        }

        let tilt = (left_shoulder.y - right_shoulder.y).abs() / shoulder_width;

        // Image y grows downwards, so a slumped head sits closer to the
        // shoulder line.
        let shoulder_line = left_shoulder.midpoint(right_shoulder);
        let ear_line = left_ear.midpoint(right_ear);
        let neck_ratio = (shoulder_line.y - ear_line.y) / shoulder_width;

        Ok(tilt > self.config.max_shoulder_tilt || neck_ratio < self.config.min_neck_ratio)
    }
}

fn require_len(landmarks: &[Landmark], expected: usize) -> Result<(), ClassifyError> {
    if landmarks.len() < expected {
        return Err(ClassifyError::InsufficientLandmarks {
            expected,
            actual: landmarks.len(),
        });
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_frontal_face_is_facing_forward() {
        let classifier = GeometricClassifier::new();
        let pose = classifier.head_pose(&face(0.0)).unwrap();

        assert!(pose.yaw.abs() < 1e-9);
        assert!(pose.pitch.abs() < 1e-9);
        assert!(classifier.is_facing_forward(&face(0.0)).unwrap());
    }

    #[test]
    fn test_turned_face_is_not_facing_forward() {
        let classifier = GeometricClassifier::new();
        // Nose pushed towards the right cheek: right_dist 0.02, left_dist 0.18.
        assert!(!classifier.is_facing_forward(&face(0.08)).unwrap());
        assert!(!classifier.is_facing_forward(&face(-0.08)).unwrap());
        // Small turns stay inside the yaw budget.
        assert!(classifier.is_facing_forward(&face(0.02)).unwrap());
    }

    #[test]
    fn test_short_face_mesh_is_an_error() {
        let classifier = GeometricClassifier::new();
        let err = classifier
            .is_facing_forward(&[Landmark::at(0.5, 0.5); 10])
            .unwrap_err();
        assert_eq!(
            err,
            ClassifyError::InsufficientLandmarks {
                expected: 455,
                actual: 10
            }
        );
    }

    #[test]
    fn test_posture_classification() {
        let classifier = GeometricClassifier::new();

        assert!(!classifier.is_bad_posture(&upright_pose()).unwrap());
        assert!(classifier.is_bad_posture(&slumped_pose()).unwrap());
        // Leaning: one shoulder 0.04 lower over a ~0.2 width.
        assert!(classifier.is_bad_posture(&pose(0.6, 0.64, 0.5)).unwrap());
    }

    #[test]
    fn test_occluded_shoulder_is_an_error() {
        let classifier = GeometricClassifier::new();
        let mut landmarks = upright_pose();
        landmarks[LEFT_SHOULDER].visibility = 0.1;

        let err = classifier.is_bad_posture(&landmarks).unwrap_err();
        assert!(matches!(err, ClassifyError::Occluded { index: 11, .. }));
    }

    #[test]
    fn test_custom_thresholds() {
        let strict = GeometricClassifier::with_config(ClassifierConfig {
            max_yaw_deg: 1.0,
            ..ClassifierConfig::default()
        });
        assert!(!strict.is_facing_forward(&face(0.02)).unwrap());
    }
}
