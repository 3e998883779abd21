//! Bitmap encoding for storage and export.

use image::ImageEncoder;
use kidsdraw_pipeline::Bitmap;

use crate::error::StoreError;

/// Encode as baseline JPEG at `quality` (1 to 100, clamped).
///
/// JPEG has no alpha channel, so alpha is dropped.
///
/// # Errors
///
/// Returns [`StoreError::Encode`] if the encoder fails.
pub fn encode_jpeg(bitmap: &Bitmap, quality: u8) -> Result<Vec<u8>, StoreError> {
    let rgb = image::DynamicImage::ImageRgba8(bitmap.clone()).into_rgb8();
    let mut bytes = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )?;
    Ok(bytes)
}

/// Encode as lossless RGBA PNG.
///
/// # Errors
///
/// Returns [`StoreError::Encode`] if the encoder fails.
pub fn encode_png(bitmap: &Bitmap) -> Result<Vec<u8>, StoreError> {
    let mut bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut bytes).write_image(
        bitmap.as_raw(),
        bitmap.width(),
        bitmap.height(),
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(bytes)
}
