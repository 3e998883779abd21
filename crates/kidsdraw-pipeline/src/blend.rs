//! Two-layer blend operators: color dodge and source-over compositing.
//!
//! Both take a foreground and a background bitmap of identical
//! dimensions and work on straight (non-premultiplied) normalized
//! samples.

use image::Rgba;

use crate::sample::{from_unit, to_unit};
use crate::types::{Dimensions, RgbaImage};

/// Blend inputs whose dimensions differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("foreground is {foreground} but background is {background}")]
pub struct DimensionMismatch {
    /// Foreground dimensions.
    pub foreground: Dimensions,
    /// Background dimensions.
    pub background: Dimensions,
}

/// Per-channel color dodge: `min(bg / (1 - fg), 1)`, with `fg == 1`
/// mapping to 1.
#[must_use]
pub fn dodge(foreground: f32, background: f32) -> f32 {
    if foreground >= 1.0 {
        return 1.0;
    }
    (background / (1.0 - foreground)).min(1.0)
}

/// Porter-Duff source-over on one straight-alpha RGBA sample.
///
/// A fully transparent result is transparent black.
#[must_use]
pub fn source_over(foreground: [f32; 4], background: [f32; 4]) -> [f32; 4] {
    let fa = foreground[3];
    let ba = background[3];
    let out_a = ba.mul_add(1.0 - fa, fa);
    if out_a <= 0.0 {
        return [0.0; 4];
    }
    let channel = |c: usize| foreground[c].mul_add(fa, background[c] * ba * (1.0 - fa)) / out_a;
    [channel(0), channel(1), channel(2), out_a]
}

/// Color-dodge `foreground` onto `background`.
///
/// RGB uses [`dodge`]. Alpha combines as in source-over so opaque inputs
/// give an opaque result.
///
/// # Errors
///
/// Returns [`DimensionMismatch`] when the layers differ in size.
pub fn color_dodge_blend(
    foreground: &RgbaImage,
    background: &RgbaImage,
) -> Result<RgbaImage, DimensionMismatch> {
    let (w, h) = check_dimensions(foreground, background)?;
    Ok(RgbaImage::from_fn(w, h, |x, y| {
        let f = foreground.get_pixel(x, y).0;
        let b = background.get_pixel(x, y).0;
        let channel = |c: usize| from_unit(dodge(to_unit(f[c]), to_unit(b[c])));
        let (fa, ba) = (to_unit(f[3]), to_unit(b[3]));
        Rgba([
            channel(0),
            channel(1),
            channel(2),
            from_unit(ba.mul_add(1.0 - fa, fa)),
        ])
    }))
}

/// Composite `foreground` over `background` (source-over).
///
/// # Errors
///
/// Returns [`DimensionMismatch`] when the layers differ in size.
pub fn source_over_composite(
    foreground: &RgbaImage,
    background: &RgbaImage,
) -> Result<RgbaImage, DimensionMismatch> {
    let (w, h) = check_dimensions(foreground, background)?;
    Ok(RgbaImage::from_fn(w, h, |x, y| {
        let f = foreground.get_pixel(x, y).0.map(to_unit);
        let b = background.get_pixel(x, y).0.map(to_unit);
        Rgba(source_over(f, b).map(from_unit))
    }))
}

fn check_dimensions(
    foreground: &RgbaImage,
    background: &RgbaImage,
) -> Result<(u32, u32), DimensionMismatch> {
    let (fg, bg) = (Dimensions::of(foreground), Dimensions::of(background));
    if fg != bg {
        return Err(DimensionMismatch {
            foreground: fg,
            background: bg,
        });
    }
    Ok(foreground.dimensions())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    // ───── dodge ─────

    #[test]
    fn dodge_with_white_foreground_is_white() {
        assert!((dodge(1.0, 0.0) - 1.0).abs() < f32::EPSILON);
        assert!((dodge(1.0, 0.4) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn dodge_with_black_foreground_is_background() {
        assert!((dodge(0.0, 0.37) - 0.37).abs() < 1e-6);
    }

    #[test]
    fn dodge_brightens() {
        assert!((dodge(0.5, 0.25) - 0.5).abs() < 1e-6);
        assert!((dodge(0.5, 0.75) - 1.0).abs() < f32::EPSILON);
    }

    proptest! {
        #[test]
        fn dodge_stays_in_unit_range(fg in 0u8..=255, bg in 0u8..=255) {
            let v = dodge(to_unit(fg), to_unit(bg));
            prop_assert!((0.0..=1.0).contains(&v));
            prop_assert!(v >= to_unit(bg) - 1e-6);
        }

        #[test]
        fn source_over_alpha_is_bounded(
            f in proptest::array::uniform4(0u8..=255),
            b in proptest::array::uniform4(0u8..=255),
        ) {
            let out = source_over(f.map(to_unit), b.map(to_unit));
            for v in out {
                prop_assert!(v.is_finite());
            }
            prop_assert!((0.0..=1.0 + 1e-6).contains(&out[3]));
        }
    }

    #[test]
    fn color_dodge_blend_of_opaque_layers() {
        let fg = RgbaImage::from_pixel(2, 2, Rgba([128, 255, 0, 255]));
        let bg = RgbaImage::from_pixel(2, 2, Rgba([64, 0, 90, 255]));
        let out = color_dodge_blend(&fg, &bg).unwrap();
        let [r, g, b, a] = out.get_pixel(1, 1).0;
        assert!(r > 64);
        assert_eq!(g, 255);
        assert_eq!(b, 90);
        assert_eq!(a, 255);
    }

    #[test]
    fn color_dodge_blend_rejects_mismatched_sizes() {
        let fg = RgbaImage::new(2, 2);
        let bg = RgbaImage::new(3, 2);
        let err = color_dodge_blend(&fg, &bg).unwrap_err();
        assert_eq!(err.foreground, Dimensions { width: 2, height: 2 });
        assert_eq!(err.to_string(), "foreground is 2x2 but background is 3x2");
    }

    // ───── source-over ─────

    #[test]
    fn opaque_foreground_occludes() {
        let out = source_over([0.1, 0.2, 0.3, 1.0], [0.9, 0.9, 0.9, 1.0]);
        assert_eq!(out, [0.1, 0.2, 0.3, 1.0]);
    }

    #[test]
    fn transparent_foreground_shows_background() {
        let out = source_over([0.1, 0.2, 0.3, 0.0], [0.9, 0.8, 0.7, 1.0]);
        for (a, b) in out.iter().zip([0.9, 0.8, 0.7, 1.0]) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn both_transparent_is_transparent_black() {
        assert_eq!(source_over([1.0, 1.0, 1.0, 0.0], [0.5, 0.5, 0.5, 0.0]), [0.0; 4]);
    }

    #[test]
    fn half_alpha_mixes_evenly_over_opaque() {
        let out = source_over([1.0, 0.0, 0.0, 0.5], [0.0, 0.0, 1.0, 1.0]);
        assert!((out[0] - 0.5).abs() < 1e-6);
        assert!((out[2] - 0.5).abs() < 1e-6);
        assert!((out[3] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn composite_rejects_mismatched_sizes() {
        let fg = RgbaImage::new(4, 1);
        let bg = RgbaImage::new(4, 2);
        assert!(source_over_composite(&fg, &bg).is_err());
    }

    #[test]
    fn composite_per_pixel() {
        let fg = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        let bg = RgbaImage::from_pixel(2, 1, Rgba([200, 100, 50, 255]));
        let out = source_over_composite(&fg, &bg).unwrap();
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(1, 0).0, [200, 100, 50, 255]);
    }
}
