//! Per-pixel color operators: desaturation, saturation/contrast
//! controls, and RGB inversion.
//!
//! All operators work on normalized RGB and leave alpha untouched. The
//! luminance weights are Rec. 709 linear coefficients, which is what the
//! app's platform color-controls filter uses.

use image::Rgba;

use crate::sample::{from_unit, to_unit};
use crate::types::RgbaImage;

/// Rec. 709 luma weights for R, G, B.
pub const LUMA_WEIGHTS: [f32; 3] = [0.2125, 0.7154, 0.0721];

/// Mid-gray pivot for contrast scaling.
const CONTRAST_PIVOT: f32 = 0.5;

/// Saturation and contrast factors applied by [`adjust_color_controls`].
///
/// `1.0` is neutral for both.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorControls {
    /// 0 → grayscale, 1 → unchanged, 2 → doubled chroma.
    pub saturation: f32,
    /// 0 → flat mid-gray, 1 → unchanged, 2 → doubled distance from 0.5.
    pub contrast: f32,
}

impl ColorControls {
    /// Leaves every pixel unchanged.
    pub const NEUTRAL: Self = Self {
        saturation: 1.0,
        contrast: 1.0,
    };
}

impl Default for ColorControls {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Weighted luminance of a normalized RGB triple.
#[must_use]
pub fn luminance([r, g, b]: [f32; 3]) -> f32 {
    LUMA_WEIGHTS[2].mul_add(b, LUMA_WEIGHTS[1].mul_add(g, LUMA_WEIGHTS[0] * r))
}

/// Apply saturation then contrast to every pixel.
///
/// Saturation interpolates each channel away from (or toward) the
/// pixel's luminance: `c' = L + (c - L) * s`. Contrast then scales
/// around mid-gray: `c'' = (c' - 0.5) * k + 0.5`. Results are clamped.
#[must_use = "returns the adjusted image"]
pub fn adjust_color_controls(image: &RgbaImage, controls: ColorControls) -> RgbaImage {
    let ColorControls {
        saturation,
        contrast,
    } = controls;
    map_rgb(image, |rgb| {
        let luma = luminance(rgb);
        rgb.map(|c| {
            let saturated = (c - luma).mul_add(saturation, luma);
            (saturated - CONTRAST_PIVOT).mul_add(contrast, CONTRAST_PIVOT)
        })
    })
}

/// Replace each pixel's RGB with its luminance.
#[must_use = "returns the grayscale image"]
pub fn desaturate(image: &RgbaImage) -> RgbaImage {
    map_rgb(image, |rgb| [luminance(rgb); 3])
}

/// Contrast-only adjustment (saturation neutral).
#[must_use = "returns the adjusted image"]
pub fn adjust_contrast(image: &RgbaImage, contrast: f32) -> RgbaImage {
    adjust_color_controls(
        image,
        ColorControls {
            contrast,
            ..ColorControls::NEUTRAL
        },
    )
}

/// Saturation and contrast in one pass.
#[must_use = "returns the adjusted image"]
pub fn adjust_contrast_saturation(image: &RgbaImage, contrast: f32, saturation: f32) -> RgbaImage {
    adjust_color_controls(
        image,
        ColorControls {
            saturation,
            contrast,
        },
    )
}

/// Invert RGB (`c → 1 - c`), keeping alpha.
#[must_use = "returns the inverted image"]
pub fn invert(image: &RgbaImage) -> RgbaImage {
    let mut out = image.clone();
    for px in out.pixels_mut() {
        let [r, g, b, a] = px.0;
        *px = Rgba([255 - r, 255 - g, 255 - b, a]);
    }
    out
}

/// Run `f` over every pixel's normalized RGB, preserving alpha.
fn map_rgb(image: &RgbaImage, f: impl Fn([f32; 3]) -> [f32; 3]) -> RgbaImage {
    let mut out = image.clone();
    for px in out.pixels_mut() {
        let [r, g, b, a] = px.0;
        let [r, g, b] = f([to_unit(r), to_unit(g), to_unit(b)]);
        *px = Rgba([from_unit(r), from_unit(g), from_unit(b), a]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swatch() -> RgbaImage {
        RgbaImage::from_fn(4, 4, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = (x * 60 + y * 13) as u8;
            Rgba([v, 255 - v, v / 2, 128 + v / 2])
        })
    }

    #[test]
    fn luminance_weights_sum_to_one() {
        let sum: f32 = LUMA_WEIGHTS.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!((luminance([1.0, 1.0, 1.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn desaturate_makes_channels_equal_and_keeps_alpha() {
        let image = swatch();
        let gray = desaturate(&image);
        for (src, out) in image.pixels().zip(gray.pixels()) {
            let [r, g, b, a] = out.0;
            assert_eq!(r, g);
            assert_eq!(g, b);
            assert_eq!(a, src.0[3]);
        }
    }

    #[test]
    fn desaturate_pure_green_uses_rec709_weight() {
        let image = RgbaImage::from_pixel(1, 1, Rgba([0, 255, 0, 255]));
        let gray = desaturate(&image);
        // 0.7154 * 255 = 182.4
        assert_eq!(gray.get_pixel(0, 0).0, [182, 182, 182, 255]);
    }

    #[test]
    fn neutral_controls_are_identity() {
        let image = swatch();
        assert_eq!(adjust_color_controls(&image, ColorControls::NEUTRAL), image);
        assert_eq!(adjust_contrast(&image, 1.0), image);
    }

    #[test]
    fn zero_contrast_is_flat_mid_gray() {
        let out = adjust_contrast(&swatch(), 0.0);
        for px in out.pixels() {
            assert_eq!(&px.0[..3], &[128, 128, 128]);
        }
    }

    #[test]
    fn double_contrast_pushes_away_from_mid_gray() {
        let image = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([64, 64, 64, 255])
            } else {
                Rgba([192, 192, 192, 255])
            }
        });
        let out = adjust_contrast(&image, 2.0);
        assert!(out.get_pixel(0, 0).0[0] < 64);
        assert!(out.get_pixel(1, 0).0[0] > 192);
    }

    #[test]
    fn zero_saturation_matches_desaturate() {
        let image = swatch();
        let a = adjust_contrast_saturation(&image, 1.0, 0.0);
        let b = desaturate(&image);
        for (pa, pb) in a.pixels().zip(b.pixels()) {
            for c in 0..4 {
                assert!(pa.0[c].abs_diff(pb.0[c]) <= 1);
            }
        }
    }

    #[test]
    fn high_saturation_widens_channel_spread() {
        let image = RgbaImage::from_pixel(1, 1, Rgba([150, 100, 100, 255]));
        let out = adjust_contrast_saturation(&image, 1.0, 2.0);
        let [r, g, _, _] = out.get_pixel(0, 0).0;
        assert!(r - g > 50);
    }

    #[test]
    fn invert_keeps_alpha_and_is_an_involution() {
        let image = swatch();
        let inverted = invert(&image);
        assert_eq!(
            inverted.get_pixel(0, 0).0[3],
            image.get_pixel(0, 0).0[3]
        );
        assert_eq!(inverted.get_pixel(0, 0).0[0], 255 - image.get_pixel(0, 0).0[0]);
        assert_eq!(invert(&inverted), image);
    }
}
