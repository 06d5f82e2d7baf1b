//! Run orchestration: list, create the output folder, then batch by batch

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::ProcessingConfig;
use crate::error::{Result, SizeCapError};
use crate::parallel::{batch_count, plan_batches, BatchProcessor, ProgressTracker, RunSummary};
use crate::processing::{Compressor, MAX_OUTPUT_BYTES};

/// Drives one run over an input folder
pub struct BatchDriver {
    settings: ProcessingConfig,
    ceiling: u64,
}

impl BatchDriver {
    /// Create a driver using the fixed output ceiling
    pub fn new(settings: ProcessingConfig) -> Self {
        Self {
            settings,
            ceiling: MAX_OUTPUT_BYTES,
        }
    }

    /// Use a different size ceiling
    pub fn with_size_ceiling(mut self, ceiling: u64) -> Self {
        self.ceiling = ceiling;
        self
    }

    pub fn settings(&self) -> &ProcessingConfig {
        &self.settings
    }

    /// Process every file directly inside `input`.
    ///
    /// A missing or empty folder is a no-op: nothing is created and an empty
    /// summary is returned.
    pub fn run(&self, input: &Path) -> Result<RunSummary> {
        self.settings.validate()?;

        let files = list_input_files(input)?;
        if files.is_empty() {
            info!("No files found in {}", input.display());
            return Ok(RunSummary::empty());
        }

        let batch_size = self.settings.batch_size;
        let total_batches = batch_count(files.len(), batch_size);
        info!(
            "Found {} files in {}, {} batches of up to {}",
            files.len(),
            input.display(),
            total_batches,
            batch_size
        );

        let folder = create_output_folder(input, &self.settings.destination_folder_name)?;
        info!("Writing results to {}", folder.display());

        let workers = self.settings.max_degree_of_parallelism;
        let cpus = num_cpus::get();
        if workers > cpus {
            warn!("Degree of parallelism {} exceeds the {} available CPUs", workers, cpus);
        }

        let tracker = Arc::new(ProgressTracker::new());
        let compressor = Compressor::with_ceiling(self.settings.step_of_compression, self.ceiling);
        let processor = BatchProcessor::new(workers, compressor, Arc::clone(&tracker))?;

        for (index, batch) in plan_batches(&files, batch_size).into_iter().enumerate() {
            debug!("Batch {}/{}: {} files", index + 1, total_batches, batch.len());

            let results = processor.process_batch(batch);
            let saved = processor.save_batch(results, &folder);

            debug!("Batch {}/{} done, {} saved", index + 1, total_batches, saved);
        }

        Ok(RunSummary::from_tracker(
            &tracker,
            files.len() as u64,
            total_batches as u64,
            folder,
        ))
    }
}

/// Regular files directly inside `path`, sorted.
///
/// Symlinks are followed, so a link to an image counts as a file. Returns an
/// empty list when `path` does not exist or is not a folder.
pub fn list_input_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        debug!("{} is not a directory", path.display());
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).min_depth(1).max_depth(1).follow_links(true) {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => warn!("Cannot read entry in {}: {}", path.display(), e),
        }
    }

    files.sort();
    Ok(files)
}

/// Candidate folder names: `name`, then `name(0)`, `name(1)`, ...
pub fn output_folder_candidate(name: &str, attempt: Option<u64>) -> String {
    match attempt {
        None => name.to_string(),
        Some(n) => format!("{}({})", name, n),
    }
}

/// Create a fresh folder named `name` inside `parent`.
///
/// Anything already present under a candidate name counts as taken.
pub fn create_output_folder(parent: &Path, name: &str) -> Result<PathBuf> {
    let mut attempt = None;

    loop {
        let candidate = parent.join(output_folder_candidate(name, attempt));

        match std::fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("{} exists, trying next name", candidate.display());
                attempt = Some(attempt.map_or(0, |n| n + 1));
            }
            Err(source) => {
                return Err(SizeCapError::OutputFolder {
                    path: candidate,
                    source,
                })
            }
        }
    }
}
