//! Input decoding and validation.
//!
//! Every style begins by checking that its input is a real pixel grid.
//! Encoded bytes (PNG, JPEG, BMP, WebP) are decoded with the `image`
//! crate and normalized to 8-bit RGBA so the downstream operators only
//! ever see one layout.

use crate::types::{Dimensions, InvalidInput, RgbaImage};

/// Decode encoded image bytes into an RGBA bitmap.
///
/// # Errors
///
/// Returns [`InvalidInput::EmptyData`] for an empty slice,
/// [`InvalidInput::Decode`] if the format is unrecognized or the data is
/// corrupt, and [`InvalidInput::ZeroSized`] if the decoded image has no
/// area.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, InvalidInput> {
    if bytes.is_empty() {
        return Err(InvalidInput::EmptyData);
    }

    let rgba = image::load_from_memory(bytes)?.into_rgba8();
    validate(&rgba)?;

    tracing::debug!(
        width = rgba.width(),
        height = rgba.height(),
        input_bytes = bytes.len(),
        "decoded input image"
    );

    Ok(rgba)
}

/// Check that `image` is usable as conversion input.
///
/// # Errors
///
/// Returns [`InvalidInput::ZeroSized`] when either dimension is zero.
pub fn validate(image: &RgbaImage) -> Result<Dimensions, InvalidInput> {
    let dimensions = Dimensions::of(image);
    if dimensions.is_empty() {
        return Err(InvalidInput::ZeroSized {
            width: dimensions.width,
            height: dimensions.height,
        });
    }
    Ok(dimensions)
}

/// Wrap a raw straight-alpha RGBA buffer (row-major, 4 bytes per pixel)
/// as a bitmap.
///
/// # Errors
///
/// Returns [`InvalidInput::BufferSize`] when `pixels.len()` is not
/// `width * height * 4`, and [`InvalidInput::ZeroSized`] for an empty
/// grid.
pub fn bitmap_from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<RgbaImage, InvalidInput> {
    let expected = u64::from(width) * u64::from(height) * 4;
    let actual = pixels.len() as u64;
    if expected != actual {
        return Err(InvalidInput::BufferSize { expected, actual });
    }

    let image = RgbaImage::from_raw(width, height, pixels)
        .ok_or(InvalidInput::BufferSize { expected, actual })?;
    validate(&image)?;
    Ok(image)
}
