//! Recorded sessions in JSON Lines form.
//!
//! Each non-blank line is one [`PerceptionFrame`]. Recordings let a session
//! be re-run through the engine deterministically on its own timestamps.

use crate::source::types::PerceptionFrame;
use std::io::BufRead;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid frame on line {line}: {source}")]
    InvalidFrame {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Frame #{index} has no captured_at_ms timestamp")]
    MissingTimestamp { index: usize },
}

/// Parse every frame from a reader.
pub fn read_frames<R: BufRead>(reader: R) -> Result<Vec<PerceptionFrame>, ReplayError> {
    let mut frames = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let frame = parse_line(&line, idx + 1)?;
        frames.push(frame);
    }

    Ok(frames)
}

/// Parse a recording file, requiring a capture timestamp on every frame.
pub fn load_recording(path: &Path) -> Result<Vec<PerceptionFrame>, ReplayError> {
    let file = std::fs::File::open(path)?;
    let frames = read_frames(std::io::BufReader::new(file))?;

    if let Some(pos) = frames.iter().position(|f| f.captured_at_ms.is_none()) {
        return Err(ReplayError::MissingTimestamp { index: pos + 1 });
    }

    tracing::info!(frames = frames.len(), path = %path.display(), "loaded recording");
    Ok(frames)
}

/// Parse a single JSON line.
pub fn parse_line(line: &str, line_number: usize) -> Result<PerceptionFrame, ReplayError> {
    serde_json::from_str(line).map_err(|source| ReplayError::InvalidFrame {
        line: line_number,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::types::Detection;

    #[test]
    fn test_read_frames_skips_blank_lines() {
        let input = "\n{\"captured_at_ms\":0}\n\n{\"captured_at_ms\":33,\"hand\":{\"status\":\"detected\",\"landmarks\":[]}}\n";
        let frames = read_frames(input.as_bytes()).unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].captured_at_ms, Some(33));
        assert_eq!(frames[1].hand, Some(Detection::none()));
    }

    #[test]
    fn test_invalid_line_reports_line_number() {
        let input = "{\"captured_at_ms\":0}\n{not json}\n";
        let err = read_frames(input.as_bytes()).unwrap_err();
        assert!(matches!(err, ReplayError::InvalidFrame { line: 2, .. }));
    }

    #[test]
    fn test_load_recording_requires_timestamps() {
        let path = std::env::temp_dir().join(format!(
            "presence-engine-replay-{}.jsonl",
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&path, "{\"captured_at_ms\":0}\n{}\n").unwrap();

        let err = load_recording(&path).unwrap_err();
        assert!(matches!(err, ReplayError::MissingTimestamp { index: 2 }));

        let _ = std::fs::remove_file(&path);
    }
}
