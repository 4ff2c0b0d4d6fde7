//! Transparency module for the presence engine.
//!
//! This module provides tools for tracking and exposing what the engine
//! processed, supporting user trust in a camera-based tool.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, SharedTransparencyLog, TransparencyLog,
    TransparencyStats,
};
