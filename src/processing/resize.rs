//! Downscale factors and resampling

use image::imageops::FilterType;
use image::DynamicImage;
use tracing::debug;

/// Filter used for every candidate. Fixed so that a run is reproducible.
pub const RESAMPLE_FILTER: FilterType = FilterType::Triangle;

/// Slack added before flooring a quotient. Far below the smallest fractional
/// part a real quotient can have, far above the rounding error of the division.
const QUOTIENT_EPSILON: f64 = 1e-9;

/// Downscale factor for a search level: `1 + level * step`.
///
/// The step is widened through its shortest decimal form, so `0.1` means one
/// tenth rather than the `f32` nearest to it.
pub fn compression_factor(level: u32, step: f32) -> f64 {
    1.0 + f64::from(level) * decimal_step(step)
}

fn decimal_step(step: f32) -> f64 {
    step.to_string().parse().unwrap_or_else(|_| f64::from(step))
}

/// Target dimensions for a factor, truncated toward zero.
///
/// Either side may come out as zero once the factor exceeds it; the caller
/// decides what that means.
pub fn scaled_dimensions(width: u32, height: u32, factor: f64) -> (u32, u32) {
    let scale = |side: u32| ((f64::from(side) / factor).abs() + QUOTIENT_EPSILON).floor() as u32;
    (scale(width), scale(height))
}

/// Resample `image` into exactly `width` x `height`
pub fn resample(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    debug!(
        "Resampling {}x{} -> {}x{} using {:?}",
        image.width(),
        image.height(),
        width,
        height,
        RESAMPLE_FILTER
    );

    image.resize_exact(width, height, RESAMPLE_FILTER)
}
