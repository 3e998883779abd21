//! Median smoothing for the Cartoon style's flat color regions.

use crate::types::RgbaImage;

/// Replace each channel sample with the median of its
/// `(2r + 1) × (2r + 1)` neighborhood. Radius 0 is the identity.
///
/// The radius is capped at the image's longer side; a window that wide
/// already spans the whole image.
#[must_use = "returns the smoothed image"]
pub fn median_smooth(image: &RgbaImage, radius: u32) -> RgbaImage {
    let radius = radius.min(image.width().max(image.height()));
    if radius == 0 {
        return image.clone();
    }
    imageproc::filter::median_filter(image, radius, radius)
}
