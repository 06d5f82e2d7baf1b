//! Content sniffing, decoding and the fixed output encoding

use std::borrow::Cow;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::error::{EncodingError, ImageFormatHint};
use image::io::Limits;
use image::{DynamicImage, ImageError};
use tracing::debug;

use crate::error::{ErrorContext, Result, SizeCapError};

/// Every fitted image is written in this format, whatever the input was
pub const OUTPUT_FORMAT: image::ImageFormat = image::ImageFormat::Png;

/// Check the file's magic bytes before handing it to a decoder.
///
/// Content recognized as a non-image type (archives, documents, text with a
/// known signature) is rejected. Unrecognized content is let through so the
/// decoder gets the final say.
pub fn sniff_content(path: &Path) -> Result<()> {
    let kind = infer::get_from_path(path).with_file_context(path.to_path_buf())?;

    match kind {
        Some(kind) if kind.matcher_type() != infer::MatcherType::Image => {
            Err(SizeCapError::unsupported_format(
                kind.mime_type(),
                Some(path.to_path_buf()),
            ))
        }
        Some(kind) => {
            debug!("Detected {} for {:?}", kind.mime_type(), path);
            Ok(())
        }
        None => {
            debug!("No known signature for {:?}, trying decoders", path);
            Ok(())
        }
    }
}

/// Decode an image, choosing the codec from content rather than extension.
///
/// The decoder's allocation limits are lifted: oversized scans and panoramas
/// are exactly the inputs that need shrinking.
pub fn decode_image(path: &Path) -> Result<DynamicImage> {
    decode_image_with_limits(path, Limits::no_limits())
}

/// Decode with explicit allocation and dimension limits
pub fn decode_image_with_limits(path: &Path, limits: Limits) -> Result<DynamicImage> {
    let mut reader = image::io::Reader::open(path)
        .with_file_context(path.to_path_buf())?
        .with_guessed_format()
        .with_file_context(path.to_path_buf())?;

    if reader.format().is_none() {
        return Err(SizeCapError::decode(
            "unrecognized image format",
            Some(path.to_path_buf()),
        ));
    }

    reader.limits(limits);
    reader.decode().with_file_context(path.to_path_buf())
}

/// Physical pixel density, as stored in a PNG `pHYs` chunk
pub type Resolution = png::PixelDimensions;

/// Pixel density recorded in a PNG source.
///
/// Only the header chunks are read. Sources that are not PNG, or carry no
/// density, yield `None`.
pub fn read_resolution(path: &Path) -> Option<Resolution> {
    let file = File::open(path).ok()?;
    let reader = png::Decoder::new(BufReader::new(file)).read_info().ok()?;
    reader.info().pixel_dims
}

/// Encode an image in the output format and return the bytes
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    encode_png_with_resolution(image, None)
}

/// Encode an image in the output format, recording `resolution` if given
pub fn encode_png_with_resolution(
    image: &DynamicImage,
    resolution: Option<Resolution>,
) -> Result<Vec<u8>> {
    use png::{BitDepth, ColorType};

    let (color, depth, samples): (ColorType, BitDepth, Cow<'_, [u8]>) = match image {
        DynamicImage::ImageLuma8(buf) => {
            (ColorType::Grayscale, BitDepth::Eight, Cow::Borrowed(buf.as_raw().as_slice()))
        }
        DynamicImage::ImageLumaA8(buf) => {
            (ColorType::GrayscaleAlpha, BitDepth::Eight, Cow::Borrowed(buf.as_raw().as_slice()))
        }
        DynamicImage::ImageRgb8(buf) => {
            (ColorType::Rgb, BitDepth::Eight, Cow::Borrowed(buf.as_raw().as_slice()))
        }
        DynamicImage::ImageRgba8(buf) => {
            (ColorType::Rgba, BitDepth::Eight, Cow::Borrowed(buf.as_raw().as_slice()))
        }
        DynamicImage::ImageLuma16(buf) => {
            (ColorType::Grayscale, BitDepth::Sixteen, big_endian(buf.as_raw()))
        }
        DynamicImage::ImageLumaA16(buf) => {
            (ColorType::GrayscaleAlpha, BitDepth::Sixteen, big_endian(buf.as_raw()))
        }
        DynamicImage::ImageRgb16(buf) => {
            (ColorType::Rgb, BitDepth::Sixteen, big_endian(buf.as_raw()))
        }
        DynamicImage::ImageRgba16(buf) => {
            (ColorType::Rgba, BitDepth::Sixteen, big_endian(buf.as_raw()))
        }
        // PNG has no float samples
        _ => (ColorType::Rgba, BitDepth::Eight, Cow::Owned(image.to_rgba8().into_raw())),
    };

    let mut buffer = Vec::new();
    let mut encoder = png::Encoder::new(&mut buffer, image.width(), image.height());
    encoder.set_color(color);
    encoder.set_depth(depth);
    encoder.set_compression(png::Compression::Default);
    encoder.set_adaptive_filter(png::AdaptiveFilterType::Adaptive);
    encoder.set_pixel_dims(resolution);

    let mut writer = encoder.write_header().map_err(png_encoding_error)?;
    writer.write_image_data(&samples).map_err(png_encoding_error)?;
    writer.finish().map_err(png_encoding_error)?;

    Ok(buffer)
}

/// PNG stores 16-bit samples big-endian
fn big_endian(samples: &[u16]) -> Cow<'_, [u8]> {
    Cow::Owned(samples.iter().flat_map(|sample| sample.to_be_bytes()).collect())
}

fn png_encoding_error(error: png::EncodingError) -> SizeCapError {
    ImageError::Encoding(EncodingError::new(ImageFormatHint::Exact(OUTPUT_FORMAT), error)).into()
}
