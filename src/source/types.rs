//! Per-frame perception results handed over by the vision pipeline.
//!
//! These types carry landmark geometry only as far as the classifiers; the
//! engine never stores them beyond the frame being processed.

use serde::{Deserialize, Serialize};

/// A normalized landmark point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    /// Detector confidence that the point is visible (0-1)
    #[serde(default = "full_visibility")]
    pub visibility: f64,
}

fn full_visibility() -> f64 {
    1.0
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64, visibility: f64) -> Self {
        Self {
            x,
            y,
            z,
            visibility,
        }
    }

    /// A fully visible point in the image plane.
    pub fn at(x: f64, y: f64) -> Self {
        Self::new(x, y, 0.0, 1.0)
    }

    /// Planar distance to another landmark.
    pub fn distance_2d(&self, other: &Landmark) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn midpoint(&self, other: &Landmark) -> Landmark {
        Landmark {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
            z: (self.z + other.z) / 2.0,
            visibility: self.visibility.min(other.visibility),
        }
    }
}

/// Landmarks for one detected face, hand or body.
pub type LandmarkSet = Vec<Landmark>;

/// Outcome of one detector on one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Detection {
    /// The detector ran; `landmarks` holds one set per detected instance and
    /// may be empty.
    Detected { landmarks: Vec<LandmarkSet> },
    /// The detector ran but failed.
    Failed { reason: String },
}

impl Detection {
    pub fn none() -> Self {
        Detection::Detected {
            landmarks: Vec::new(),
        }
    }

    pub fn single(set: LandmarkSet) -> Self {
        Detection::Detected {
            landmarks: vec![set],
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Detection::Failed {
            reason: reason.into(),
        }
    }

    /// First detected instance, if any.
    pub fn first(&self) -> Option<&LandmarkSet> {
        match self {
            Detection::Detected { landmarks } => landmarks.first(),
            Detection::Failed { .. } => None,
        }
    }

    /// Whether anything was detected. `None` if the detector failed.
    pub fn is_present(&self) -> Option<bool> {
        match self {
            Detection::Detected { landmarks } => Some(!landmarks.is_empty()),
            Detection::Failed { .. } => None,
        }
    }
}

/// Everything the perception pipeline produced for a single video frame.
///
/// A missing detector entry means that detector produced no new result for
/// this frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerceptionFrame {
    /// Capture time on the recording's monotonic timeline (milliseconds).
    /// Only used by replays; live sessions timestamp on arrival.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face: Option<Detection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hand: Option<Detection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose: Option<Detection>,
}

impl PerceptionFrame {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn at_ms(mut self, ms: u64) -> Self {
        self.captured_at_ms = Some(ms);
        self
    }

    pub fn with_face(mut self, face: Detection) -> Self {
        self.face = Some(face);
        self
    }

    pub fn with_hand(mut self, hand: Detection) -> Self {
        self.hand = Some(hand);
        self
    }

    pub fn with_pose(mut self, pose: Detection) -> Self {
        self.pose = Some(pose);
        self
    }
}
