//! Privacy-preserving transparency log.
//!
//! This module tracks and exposes statistics about what the engine processed
//! without storing any images, landmarks or other identifying information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Transparency statistics for the current session.
#[derive(Debug)]
pub struct TransparencyLog {
    /// Number of frame iterations processed
    frames_processed: AtomicU64,
    /// Iterations where no perception result arrived in time
    frames_without_result: AtomicU64,
    /// Signals dropped because a detector or classifier failed
    classification_failures: AtomicU64,
    /// Times the clock was seen running backwards
    clock_anomalies: AtomicU64,
    /// Number of session reports exported
    reports_exported: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl TransparencyLog {
    /// Create a new transparency log.
    pub fn new() -> Self {
        Self {
            frames_processed: AtomicU64::new(0),
            frames_without_result: AtomicU64::new(0),
            classification_failures: AtomicU64::new(0),
            clock_anomalies: AtomicU64::new(0),
            reports_exported: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a transparency log with persistence.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        // Try to load existing stats
        if let Err(e) = log.load() {
            tracing::warn!("could not load previous transparency stats: {e}");
        }

        log
    }

    /// Record a processed frame iteration.
    pub fn record_frame(&self, had_result: bool) {
        self.frames_processed.fetch_add(1, Ordering::Relaxed);
        if !had_result {
            self.frames_without_result.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record dropped observations.
    pub fn record_classification_failures(&self, count: u64) {
        self.classification_failures
            .fetch_add(count, Ordering::Relaxed);
    }

    /// Record a backwards clock step.
    pub fn record_clock_anomaly(&self) {
        self.clock_anomalies.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an exported report.
    pub fn record_report_exported(&self) {
        self.reports_exported.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            frames_without_result: self.frames_without_result.load(Ordering::Relaxed),
            classification_failures: self.classification_failures.load(Ordering::Relaxed),
            clock_anomalies: self.clock_anomalies.load(Ordering::Relaxed),
            reports_exported: self.reports_exported.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Frames processed: {}\n\
             - Frames without a result: {}\n\
             - Dropped observations: {}\n\
             - Clock anomalies: {}\n\
             - Reports exported: {}\n\
             - Session duration: {} seconds\n\
             \n\
             Privacy Guarantee:\n\
             - No video frames stored\n\
             - No landmark coordinates stored\n\
             - Only per-signal counters and durations retained",
            stats.frames_processed,
            stats.frames_without_result,
            stats.classification_failures,
            stats.clock_anomalies,
            stats.reports_exported,
            stats.session_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                frames_processed: stats.frames_processed,
                frames_without_result: stats.frames_without_result,
                classification_failures: stats.classification_failures,
                clock_anomalies: stats.clock_anomalies,
                reports_exported: stats.reports_exported,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Load stats from disk.
    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.frames_processed
                    .store(persisted.frames_processed, Ordering::Relaxed);
                self.frames_without_result
                    .store(persisted.frames_without_result, Ordering::Relaxed);
                self.classification_failures
                    .store(persisted.classification_failures, Ordering::Relaxed);
                self.clock_anomalies
                    .store(persisted.clock_anomalies, Ordering::Relaxed);
                self.reports_exported
                    .store(persisted.reports_exported, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.frames_processed.store(0, Ordering::Relaxed);
        self.frames_without_result.store(0, Ordering::Relaxed);
        self.classification_failures.store(0, Ordering::Relaxed);
        self.clock_anomalies.store(0, Ordering::Relaxed);
        self.reports_exported.store(0, Ordering::Relaxed);
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of transparency statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub frames_processed: u64,
    pub frames_without_result: u64,
    pub classification_failures: u64,
    pub clock_anomalies: u64,
    pub reports_exported: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    frames_processed: u64,
    frames_without_result: u64,
    classification_failures: u64,
    clock_anomalies: u64,
    reports_exported: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared transparency log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

/// Create a new shared transparency log.
pub fn create_shared_log() -> SharedTransparencyLog {
    Arc::new(TransparencyLog::new())
}

/// Create a new shared transparency log with persistence.
pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedTransparencyLog {
    Arc::new(TransparencyLog::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transparency_log_counting() {
        let log = TransparencyLog::new();

        log.record_frame(true);
        log.record_frame(false);
        log.record_frame(true);
        log.record_classification_failures(2);
        log.record_clock_anomaly();

        let stats = log.stats();
        assert_eq!(stats.frames_processed, 3);
        assert_eq!(stats.frames_without_result, 1);
        assert_eq!(stats.classification_failures, 2);
        assert_eq!(stats.clock_anomalies, 1);
    }

    #[test]
    fn test_transparency_log_reset() {
        let log = TransparencyLog::new();

        log.record_frame(false);
        log.record_report_exported();
        log.reset();

        let stats = log.stats();
        assert_eq!(stats.frames_processed, 0);
        assert_eq!(stats.frames_without_result, 0);
        assert_eq!(stats.reports_exported, 0);
    }

    #[test]
    fn test_persistence_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "presence-engine-transparency-{}.json",
            uuid::Uuid::new_v4()
        ));

        let log = TransparencyLog::with_persistence(path.clone());
        log.record_frame(true);
        log.record_frame(true);
        log.save().unwrap();

        let reloaded = TransparencyLog::with_persistence(path.clone());
        assert_eq!(reloaded.stats().frames_processed, 2);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_reset_clears_persisted_counters() {
        let path = std::env::temp_dir().join(format!(
            "presence-engine-transparency-{}.json",
            uuid::Uuid::new_v4()
        ));

        let log = TransparencyLog::with_persistence(path.clone());
        log.record_frame(false);
        log.record_clock_anomaly();
        log.save().unwrap();

        let reopened = TransparencyLog::with_persistence(path.clone());
        assert_eq!(reopened.stats().frames_processed, 1);
        reopened.reset();
        reopened.save().unwrap();

        let stats = TransparencyLog::with_persistence(path.clone()).stats();
        assert_eq!(stats.frames_processed, 0);
        assert_eq!(stats.frames_without_result, 0);
        assert_eq!(stats.clock_anomalies, 0);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_summary_format() {
        let log = TransparencyLog::new();
        let summary = log.summary();

        assert!(summary.contains("Frames processed"));
        assert!(summary.contains("Dropped observations"));
        assert!(summary.contains("Privacy Guarantee"));
        assert!(summary.contains("No video frames stored"));
    }
}
