//! Bounded worker pool that fits and saves one batch at a time

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use crate::error::{Result, SizeCapError};
use crate::processing::{Compressor, FittedImage};

pub mod batches;
pub mod progress;

pub use batches::*;
pub use progress::*;

/// Fitted images of one batch, keyed by output file name
pub type BatchResults = DashMap<String, FittedImage>;

/// Fans a batch out to a fixed number of workers
pub struct BatchProcessor {
    pool: ThreadPool,
    compressor: Compressor,
    tracker: Arc<ProgressTracker>,
    workers: usize,
}

impl BatchProcessor {
    /// Create a processor with `workers` threads
    pub fn new(workers: usize, compressor: Compressor, tracker: Arc<ProgressTracker>) -> Result<Self> {
        if workers == 0 {
            return Err(SizeCapError::parallel("worker count must be greater than 0"));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("sizecap-worker-{}", index))
            .build()?;

        info!("Initializing worker pool with {} threads", workers);

        Ok(Self {
            pool,
            compressor,
            tracker,
            workers,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn tracker(&self) -> &Arc<ProgressTracker> {
        &self.tracker
    }

    /// Fit every file of the batch in parallel.
    ///
    /// Files that fail are logged and left out of the returned map.
    pub fn process_batch(&self, files: &[PathBuf]) -> BatchResults {
        let results = BatchResults::with_capacity(files.len());

        self.pool.install(|| {
            files.par_iter().for_each(|path| {
                match self.compressor.compress_file(path) {
                    Ok(fitted) => {
                        self.tracker.record_processed(&fitted.file_name);
                        if fitted.was_downscaled() {
                            debug!(
                                "{:?}: {}x{} -> {}x{} at level {} ({} bytes, {:.2}s)",
                                path,
                                fitted.original_width,
                                fitted.original_height,
                                fitted.width,
                                fitted.height,
                                fitted.level,
                                fitted.encoded_size(),
                                fitted.processing_time.as_secs_f64()
                            );
                        } else {
                            debug!(
                                "{:?}: already fits at {}x{} ({} bytes)",
                                path,
                                fitted.width,
                                fitted.height,
                                fitted.encoded_size()
                            );
                        }
                        results.insert(fitted.file_name.clone(), fitted);
                    }
                    Err(e) => {
                        self.tracker.record_skipped();
                        warn!("{} was skipped: {}", path.display(), e.user_message());
                    }
                }
            });
        });

        results
    }

    /// Write every fitted image of a batch into `folder`.
    ///
    /// Consumes the batch so its buffers are released once written. Returns
    /// the number of files saved.
    pub fn save_batch(&self, results: BatchResults, folder: &Path) -> u64 {
        let entries: Vec<(String, FittedImage)> = results.into_iter().collect();

        self.pool.install(|| {
            entries
                .into_par_iter()
                .map(|(file_name, fitted)| match save_fitted(folder, &file_name, &fitted) {
                    Ok(bytes) => {
                        self.tracker.record_saved(bytes);
                        1
                    }
                    Err(e) => {
                        self.tracker.record_skipped();
                        warn!("{} was skipped: {}", fitted.source_path.display(), e.user_message());
                        0
                    }
                })
                .sum()
        })
    }
}

/// Write one fitted image, returning the number of bytes written
pub fn save_fitted(folder: &Path, file_name: &str, fitted: &FittedImage) -> Result<u64> {
    let output_path = folder.join(file_name);

    std::fs::write(&output_path, &fitted.encoded).map_err(|source| SizeCapError::SaveError {
        file: output_path.clone(),
        source,
    })?;

    debug!("Saved {:?} ({} bytes)", output_path, fitted.encoded_size());
    Ok(fitted.encoded_size())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, Rgb};
    use tempfile::TempDir;

    fn write_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8])
        });
        DynamicImage::ImageRgb8(img).save(&path).unwrap();
        path
    }

    fn processor(workers: usize) -> BatchProcessor {
        BatchProcessor::new(
            workers,
            Compressor::new(0.1),
            Arc::new(ProgressTracker::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_zero_workers_rejected() {
        let result = BatchProcessor::new(0, Compressor::new(0.1), Arc::new(ProgressTracker::new()));
        assert!(result.is_err());
    }

    #[test]
    fn test_corrupt_file_is_left_out() {
        let input = TempDir::new().unwrap();
        let files = vec![
            write_image(input.path(), "a.png", 30, 20),
            write_image(input.path(), "b.png", 10, 40),
            {
                let path = input.path().join("c.png");
                std::fs::write(&path, b"corrupt").unwrap();
                path
            },
        ];

        let processor = processor(2);
        let results = processor.process_batch(&files);

        assert_eq!(results.len(), 2);
        assert!(results.contains_key("a.png"));
        assert!(results.contains_key("b.png"));
        assert!(!results.contains_key("c.png"));
        assert_eq!(processor.tracker().processed(), 2);
        assert_eq!(processor.tracker().skipped(), 1);
    }

    #[test]
    fn test_save_batch_writes_measured_bytes() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let files = vec![
            write_image(input.path(), "one.png", 16, 16),
            write_image(input.path(), "two.png", 24, 8),
        ];

        let processor = processor(4);
        let results = processor.process_batch(&files);
        let expected: u64 = results.iter().map(|entry| entry.value().encoded_size()).sum();

        let saved = processor.save_batch(results, output.path());
        assert_eq!(saved, 2);
        assert_eq!(processor.tracker().bytes_written(), expected);

        for name in ["one.png", "two.png"] {
            let written = std::fs::read(output.path().join(name)).unwrap();
            let decoded = image::load_from_memory(&written).unwrap();
            assert!(decoded.width() > 0);
        }
    }

    #[test]
    fn test_failed_save_is_skipped() {
        let input = TempDir::new().unwrap();
        let files = vec![write_image(input.path(), "lost.png", 8, 8)];

        let processor = processor(1);
        let results = processor.process_batch(&files);
        let missing = input.path().join("does-not-exist");

        assert_eq!(processor.save_batch(results, &missing), 0);
        assert_eq!(processor.tracker().saved(), 0);
        assert_eq!(processor.tracker().skipped(), 1);
    }
}
