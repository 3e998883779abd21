//! Sobel edge detection with an intensity multiplier.
//!
//! Each RGB channel gets its own Sobel gradient magnitude (via
//! [`imageproc::gradients::sobel_gradients`]). Magnitudes are normalized
//! so that a full black-to-white step has response `1.0`, multiplied by
//! the caller's intensity, and clamped. The result is bright where the
//! source changes and black in flat regions.

use image::{GrayImage, ImageBuffer, Luma, Rgba};

use crate::sample::{from_unit, to_unit};
use crate::types::RgbaImage;

/// Sobel magnitude of a hard 0 → 255 step: `(1 + 2 + 1) * 255`.
pub const STEP_EDGE_RESPONSE: f32 = 4.0 * 255.0;

/// Detect edges in `image`, scaling the normalized response by
/// `intensity`.
///
/// Non-positive or non-finite intensity yields an all-black edge map.
/// Alpha is copied from the source.
#[must_use = "returns the edge map"]
pub fn detect_edges(image: &RgbaImage, intensity: f32) -> RgbaImage {
    let (w, h) = image.dimensions();

    if !(intensity.is_finite() && intensity > 0.0) {
        return RgbaImage::from_fn(w, h, |x, y| Rgba([0, 0, 0, image.get_pixel(x, y).0[3]]));
    }

    let gradients: [ImageBuffer<Luma<u16>, Vec<u16>>; 3] = std::array::from_fn(|c| {
        let channel = GrayImage::from_fn(w, h, |x, y| Luma([image.get_pixel(x, y).0[c]]));
        imageproc::gradients::sobel_gradients(&channel)
    });

    let scale = intensity / STEP_EDGE_RESPONSE;
    RgbaImage::from_fn(w, h, |x, y| {
        let edge = |c: usize| from_unit(f32::from(gradients[c].get_pixel(x, y).0[0]) * scale);
        Rgba([edge(0), edge(1), edge(2), image.get_pixel(x, y).0[3]])
    })
}

/// Turn an edge map into a coverage layer: alpha becomes the strongest
/// channel's response times the original alpha, RGB is kept.
///
/// Flat regions become transparent, strong edges stay opaque.
#[must_use = "returns the edge layer"]
pub fn edge_strength_alpha(edges: &RgbaImage) -> RgbaImage {
    let mut out = edges.clone();
    for px in out.pixels_mut() {
        let [r, g, b, a] = px.0;
        let strength = r.max(g).max(b);
        px.0[3] = from_unit(to_unit(strength) * to_unit(a));
    }
    out
}
