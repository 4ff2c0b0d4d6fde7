//! Frame input for the presence engine.
//!
//! This module defines the per-frame perception results the engine consumes
//! and the ways they arrive: a bounded channel fed by a live perception
//! pipeline, or a JSON Lines recording replayed on its own timestamps.

pub mod channel;
pub mod replay;
pub mod types;

// Re-export commonly used types
pub use channel::{ChannelSource, FrameSender, SourceError};
pub use replay::{load_recording, read_frames, ReplayError};
pub use types::{Detection, Landmark, LandmarkSet, PerceptionFrame};
