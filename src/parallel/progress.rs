//! Run-wide counters shared by the workers

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

/// Thread-safe counters for one run.
///
/// Workers only ever add to these; nothing is reset between batches.
#[derive(Debug)]
pub struct ProgressTracker {
    start_time: Instant,
    processed: AtomicU64,
    saved: AtomicU64,
    skipped: AtomicU64,
    bytes_written: AtomicU64,
}

impl ProgressTracker {
    /// Create a new progress tracker
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            processed: AtomicU64::new(0),
            saved: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
        }
    }

    /// Count a file whose fit was found and log the running total
    pub fn record_processed(&self, file_name: &str) -> u64 {
        let total = self.processed.fetch_add(1, Ordering::SeqCst) + 1;
        info!("{} processed. Total processed files count: {}", file_name, total);
        total
    }

    /// Count a file that was written to the output folder
    pub fn record_saved(&self, bytes: u64) {
        self.saved.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Count a file that was skipped at any stage
    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }

    pub fn saved(&self) -> u64 {
        self.saved.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub files_found: u64,
    pub batches: u64,
    pub processed: u64,
    pub saved: u64,
    pub skipped: u64,
    pub bytes_written: u64,
    pub output_folder: Option<PathBuf>,
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl RunSummary {
    /// Summary of a run that found nothing to do
    pub fn empty() -> Self {
        Self::default()
    }

    /// Snapshot the tracker's counters
    pub fn from_tracker(
        tracker: &ProgressTracker,
        files_found: u64,
        batches: u64,
        output_folder: PathBuf,
    ) -> Self {
        Self {
            files_found,
            batches,
            processed: tracker.processed(),
            saved: tracker.saved(),
            skipped: tracker.skipped(),
            bytes_written: tracker.bytes_written(),
            output_folder: Some(output_folder),
            elapsed: tracker.elapsed(),
        }
    }

    /// Files per second over the whole run
    pub fn files_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.saved as f64 / secs
        } else {
            0.0
        }
    }

    /// Average output size as human-readable string
    pub fn average_size_text(&self) -> String {
        if self.saved == 0 {
            return "n/a".to_string();
        }
        let average = self.bytes_written / self.saved;
        let mb = average as f64 / 1024.0 / 1024.0;
        if mb >= 1.0 {
            format!("{:.1} MB", mb)
        } else {
            format!("{:.0} KB", average as f64 / 1024.0)
        }
    }
}

fn serialize_secs<S>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_counters() {
        let tracker = ProgressTracker::new();
        assert_eq!(tracker.record_processed("a.png"), 1);
        assert_eq!(tracker.record_processed("b.png"), 2);
        tracker.record_saved(1024);
        tracker.record_skipped();

        assert_eq!(tracker.processed(), 2);
        assert_eq!(tracker.saved(), 1);
        assert_eq!(tracker.skipped(), 1);
        assert_eq!(tracker.bytes_written(), 1024);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let tracker = Arc::new(ProgressTracker::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    for _ in 0..250 {
                        tracker.record_processed("x.png");
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(tracker.processed(), 2000);
    }

    #[test]
    fn test_summary_json() {
        let tracker = ProgressTracker::new();
        tracker.record_processed("a.png");
        tracker.record_saved(2_048_000);

        let summary = RunSummary::from_tracker(&tracker, 3, 1, PathBuf::from("out"));
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["files_found"], 3);
        assert_eq!(json["saved"], 1);
        assert_eq!(json["output_folder"], "out");
        assert!(json["elapsed"].is_f64());
        assert_eq!(summary.average_size_text(), "2.0 MB");
    }

    #[test]
    fn test_empty_summary() {
        let summary = RunSummary::empty();
        assert!(summary.output_folder.is_none());
        assert_eq!(summary.average_size_text(), "n/a");
        assert_eq!(summary.files_per_second(), 0.0);
    }
}
