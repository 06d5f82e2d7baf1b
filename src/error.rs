//! Error types and handling for SizeCap

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for SizeCap operations
pub type Result<T> = std::result::Result<T, SizeCapError>;

/// Main error type for SizeCap operations
#[derive(Debug, Error)]
pub enum SizeCapError {
    /// I/O related errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Image decoding or encoding errors
    #[error("Image processing error: {0}")]
    ImageError(#[from] image::ImageError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// File content is recognized as something other than an image
    #[error("Unsupported file type: {format} (file: {file:?})")]
    UnsupportedFormat {
        format: String,
        file: Option<PathBuf>,
    },

    /// Image could not be decoded
    #[error("Failed to decode image: {message} (file: {file:?})")]
    DecodeError {
        message: String,
        file: Option<PathBuf>,
    },

    /// The search shrank the image to nothing without getting under the ceiling
    #[error("No size under {ceiling} bytes reachable, stopped at level {level} (file: {file:?})")]
    DimensionsExhausted {
        ceiling: u64,
        level: u32,
        file: Option<PathBuf>,
    },

    /// Writing a fitted image to the output folder failed
    #[error("Failed to save {file:?}: {source}")]
    SaveError {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output folder could not be created
    #[error("Cannot create output folder {path:?}: {source}")]
    OutputFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Worker pool errors
    #[error("Parallel processing error: {message}")]
    ParallelError { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerdeError(String),
}

impl SizeCapError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new unsupported format error
    pub fn unsupported_format<S: Into<String>>(format: S, file: Option<PathBuf>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
            file,
        }
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(message: S, file: Option<PathBuf>) -> Self {
        Self::DecodeError {
            message: message.into(),
            file,
        }
    }

    pub fn dimensions_exhausted(ceiling: u64, level: u32, file: Option<PathBuf>) -> Self {
        Self::DimensionsExhausted {
            ceiling,
            level,
            file,
        }
    }

    /// Create a new parallel processing error
    pub fn parallel<S: Into<String>>(message: S) -> Self {
        Self::ParallelError {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (the run can continue with the next file)
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Per-file failures: log, skip, continue
            Self::IoError(_)
            | Self::ImageError(_)
            | Self::UnsupportedFormat { .. }
            | Self::DecodeError { .. }
            | Self::DimensionsExhausted { .. }
            | Self::SaveError { .. } => true,

            // Setup failures stop the run
            Self::ConfigError { .. }
            | Self::SerdeError(_)
            | Self::OutputFolder { .. }
            | Self::ParallelError { .. } => false,
        }
    }

    /// Get the associated file path if available
    pub fn file_path(&self) -> Option<&PathBuf> {
        match self {
            Self::UnsupportedFormat { file, .. }
            | Self::DecodeError { file, .. }
            | Self::DimensionsExhausted { file, .. } => file.as_ref(),

            Self::SaveError { file, .. } => Some(file),
            Self::OutputFolder { path, .. } => Some(path),

            _ => None,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::IoError(e) => format!("File system error: {}", e),
            Self::ImageError(e) => format!("Image processing failed: {}", e),
            Self::UnsupportedFormat { format, .. } => {
                format!("Not an image ({}), skipped", format)
            }
            Self::DimensionsExhausted { ceiling, .. } => {
                format!(
                    "Image cannot be shrunk below {:.2} MB",
                    *ceiling as f64 / 1024.0 / 1024.0
                )
            }
            Self::OutputFolder { path, source } => {
                format!("Cannot create output folder {}: {}", path.display(), source)
            }
            other => other.to_string(),
        }
    }
}

impl From<toml::de::Error> for SizeCapError {
    fn from(err: toml::de::Error) -> Self {
        Self::SerdeError(format!("TOML parsing error: {}", err))
    }
}

impl From<serde_yaml::Error> for SizeCapError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::SerdeError(format!("YAML parsing error: {}", err))
    }
}

impl From<rayon::ThreadPoolBuildError> for SizeCapError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Self::parallel(format!("Failed to build worker pool: {}", err))
    }
}

/// Error context extension for adding file path information
pub trait ErrorContext<T> {
    /// Add file context to an error
    fn with_file_context(self, file: PathBuf) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<SizeCapError>,
{
    fn with_file_context(self, file: PathBuf) -> Result<T> {
        self.map_err(|e| match e.into() {
            // Bare decode failures carry no path of their own
            SizeCapError::ImageError(err) => SizeCapError::decode(err.to_string(), Some(file)),
            mut error => {
                match &mut error {
                    SizeCapError::UnsupportedFormat { file: f, .. }
                    | SizeCapError::DecodeError { file: f, .. }
                    | SizeCapError::DimensionsExhausted { file: f, .. } => {
                        if f.is_none() {
                            *f = Some(file);
                        }
                    }
                    _ => {}
                }
                error
            }
        })
    }
}
