//! Gaussian blur for the Sketch style's soft inverted layer.
//!
//! Wraps [`imageproc::filter::gaussian_blur_f32`], blurring each RGBA
//! channel independently.

use image::GrayImage;

use crate::types::RgbaImage;

/// Blur `image` with standard deviation `radius`.
///
/// Non-positive or non-finite radius returns the image unchanged, since
/// `imageproc` panics on `sigma <= 0.0`.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &RgbaImage, radius: f32) -> RgbaImage {
    if !(radius.is_finite() && radius > 0.0) {
        return image.clone();
    }

    let (w, h) = image.dimensions();

    let channels: [GrayImage; 4] = std::array::from_fn(|c| {
        GrayImage::from_fn(w, h, |x, y| image::Luma([image.get_pixel(x, y).0[c]]))
    });
    let blurred: [GrayImage; 4] =
        std::array::from_fn(|c| imageproc::filter::gaussian_blur_f32(&channels[c], radius));

    RgbaImage::from_fn(w, h, |x, y| {
        image::Rgba(std::array::from_fn(|c| blurred[c].get_pixel(x, y).0[0]))
    })
}
