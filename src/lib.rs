//! SizeCap - batch image shrinker
//!
//! Scans a folder of images and writes a copy of each one, shrunk just enough
//! that its encoded size falls under a fixed byte ceiling (8 MiB). Files are
//! handled in fixed-size batches; the files of a batch are fitted in parallel
//! on a bounded worker pool.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sizecap::{BatchDriver, Profiles};
//! use std::path::Path;
//!
//! let summary = BatchDriver::new(Profiles::standard())
//!     .run(Path::new("photos"))?;
//!
//! println!("{} of {} files saved", summary.saved, summary.files_found);
//! # Ok::<(), sizecap::SizeCapError>(())
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod driver;
pub mod error;
pub mod parallel;
pub mod processing;

// Re-export commonly used types
pub use config::{Config, LoggingConfig, ProcessingConfig, Profiles};
pub use driver::{create_output_folder, list_input_files, BatchDriver};
pub use error::{Result, SizeCapError};
pub use parallel::{BatchProcessor, ProgressTracker, RunSummary};
pub use processing::{Compressor, FittedImage, MAX_OUTPUT_BYTES};

use tracing::{info, warn};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize SizeCap with default logging
///
/// Should be called once at program start. Later calls keep the first
/// subscriber.
pub fn init() -> Result<()> {
    init_with_config(&Config::default())
}

/// Initialize with custom configuration
///
/// `RUST_LOG`, when set, takes precedence over the configured level. Log
/// lines go to stderr so stdout carries only the prompt and the summary.
pub fn init_with_config(config: &Config) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_names(true);

    let installed = if config.logging.json_format {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if installed {
        info!("SizeCap v{} initialized", VERSION);
    }

    log_system_capabilities();

    Ok(())
}

fn log_system_capabilities() {
    use sysinfo::{System, SystemExt};

    let mut system = System::new();
    system.refresh_memory();

    // Decoded frames of a batch are held in memory at the same time
    const LOW_MEMORY_MB: u64 = 512;
    let available_mb = system.available_memory() / (1024 * 1024);
    if available_mb < LOW_MEMORY_MB {
        warn!(
            "Low available memory: {}MB (recommended: >{}MB)",
            available_mb, LOW_MEMORY_MB
        );
    }

    info!("Detected {} logical CPUs", num_cpus::get());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_init() {
        // Should not fail on multiple calls
        assert!(init().is_ok());
        assert!(init().is_ok());
    }

    #[test]
    fn test_init_with_json_logging() {
        let mut config = Config::default();
        config.logging.json_format = true;
        assert!(init_with_config(&config).is_ok());
    }
}
