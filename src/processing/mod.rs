//! Per-file resize-and-fit search

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use image::{DynamicImage, GenericImageView};
use tracing::debug;

use crate::error::{Result, SizeCapError};

pub mod formats;
pub mod resize;

pub use formats::*;
pub use resize::*;

/// Largest encoded size, in bytes, an output file may have (exclusive)
pub const MAX_OUTPUT_BYTES: u64 = 8_388_608;

/// Shrinks images until their encoding fits under a byte ceiling
#[derive(Debug, Clone)]
pub struct Compressor {
    step: f32,
    ceiling: u64,
}

impl Compressor {
    /// Create a compressor with the fixed output ceiling
    pub fn new(step: f32) -> Self {
        Self::with_ceiling(step, MAX_OUTPUT_BYTES)
    }

    /// Create a compressor with a custom ceiling
    pub fn with_ceiling(step: f32, ceiling: u64) -> Self {
        Self { step, ceiling }
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    pub fn ceiling(&self) -> u64 {
        self.ceiling
    }

    /// Decode a file and fit it under the ceiling.
    ///
    /// The decoded image lives only for the duration of this call.
    pub fn compress_file(&self, path: &Path) -> Result<FittedImage> {
        let start_time = Instant::now();

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| SizeCapError::decode("path has no file name", Some(path.to_path_buf())))?;

        sniff_content(path)?;
        let image = decode_image(path)?;
        let resolution = read_resolution(path);

        debug!(
            "Loaded {:?}: {}x{} {:?}",
            path,
            image.width(),
            image.height(),
            image.color()
        );

        let outcome = self.fit_with_resolution(&image, resolution).map_err(|e| match e {
            SizeCapError::DimensionsExhausted { ceiling, level, .. } => {
                SizeCapError::dimensions_exhausted(ceiling, level, Some(path.to_path_buf()))
            }
            other => other,
        })?;

        Ok(FittedImage {
            file_name,
            source_path: path.to_path_buf(),
            original_width: image.width(),
            original_height: image.height(),
            width: outcome.width,
            height: outcome.height,
            level: outcome.level,
            factor: outcome.factor,
            resolution,
            encoded: outcome.encoded,
            processing_time: start_time.elapsed(),
        })
    }

    /// Linear search for the first level whose encoding is under the ceiling.
    ///
    /// Level 0 encodes the image untouched. Each candidate is dropped before
    /// the next level is tried.
    pub fn fit(&self, image: &DynamicImage) -> Result<FitOutcome> {
        self.fit_with_resolution(image, None)
    }

    /// Same search, recording `resolution` in every candidate.
    ///
    /// The density is carried over unchanged, so it is part of the measured
    /// size.
    pub fn fit_with_resolution(
        &self,
        image: &DynamicImage,
        resolution: Option<Resolution>,
    ) -> Result<FitOutcome> {
        let (original_width, original_height) = image.dimensions();
        let mut level = 0u32;

        loop {
            let factor = compression_factor(level, self.step);
            let (width, height) = scaled_dimensions(original_width, original_height, factor);

            if width == 0 || height == 0 {
                return Err(SizeCapError::dimensions_exhausted(self.ceiling, level, None));
            }

            let encoded = if (width, height) == (original_width, original_height) {
                encode_png_with_resolution(image, resolution)?
            } else {
                let candidate = resample(image, width, height);
                encode_png_with_resolution(&candidate, resolution)?
            };

            let size = encoded.len() as u64;
            if size < self.ceiling {
                debug!(
                    "Accepted level {} (factor {:.2}): {}x{}, {} bytes",
                    level, factor, width, height, size
                );
                return Ok(FitOutcome {
                    width,
                    height,
                    level,
                    factor,
                    encoded,
                });
            }

            debug!(
                "Level {} (factor {:.2}): {}x{} encodes to {} bytes, limit {}",
                level, factor, width, height, size, self.ceiling
            );
            level += 1;
        }
    }
}

/// Accepted candidate of a fit search
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub width: u32,
    pub height: u32,
    pub level: u32,
    pub factor: f64,
    pub encoded: Vec<u8>,
}

/// A file that fits under the ceiling, ready to be written
#[derive(Debug, Clone)]
pub struct FittedImage {
    /// Name the output file is written under
    pub file_name: String,
    pub source_path: PathBuf,
    pub original_width: u32,
    pub original_height: u32,
    pub width: u32,
    pub height: u32,
    pub level: u32,
    pub factor: f64,
    /// Pixel density of the source, carried into the output
    pub resolution: Option<Resolution>,
    /// Encoded output bytes, exactly as measured by the search
    pub encoded: Vec<u8>,
    pub processing_time: Duration,
}

impl FittedImage {
    /// Size of the output file in bytes
    pub fn encoded_size(&self) -> u64 {
        self.encoded.len() as u64
    }

    /// Whether the search had to downsample at all
    pub fn was_downscaled(&self) -> bool {
        self.level > 0
    }
}
