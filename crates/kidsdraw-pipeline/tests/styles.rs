#![allow(clippy::unwrap_used)]

use image::{ImageEncoder, Rgba};
use kidsdraw_pipeline::{
    ConversionError, ConversionParameters, InvalidInput, ProgressRecorder, RgbaImage, StyleKind,
    convert, convert_bytes, convert_with_observer,
};
use proptest::prelude::*;

// ───── fixtures ─────

/// Black left half, white right half.
fn step_image(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_fn(w, h, |x, _| {
        if x < w / 2 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    })
}

/// A colorful gradient with a dark disc in the middle.
fn drawing(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_fn(w, h, |x, y| {
        let (cx, cy) = (i64::from(w / 2), i64::from(h / 2));
        let (dx, dy) = (i64::from(x) - cx, i64::from(y) - cy);
        if dx * dx + dy * dy < i64::from(w.min(h) / 4).pow(2) {
            Rgba([20, 20, 60, 255])
        } else {
            #[allow(clippy::cast_possible_truncation)]
            Rgba([(x * 255 / w) as u8, (y * 255 / h) as u8, 180, 255])
        }
    })
}

fn encode_png(image: &RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buf)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
    buf
}

fn defaults() -> ConversionParameters {
    ConversionParameters::default()
}

// ───── shape and progress ─────

#[test]
fn every_style_preserves_dimensions() {
    for (w, h) in [(1, 1), (1, 9), (9, 1), (17, 11), (40, 32)] {
        let image = drawing(w, h);
        for style in StyleKind::ALL {
            let out = convert(&image, style, &defaults()).unwrap();
            assert_eq!(out.dimensions(), (w, h), "{style} {w}x{h}");
        }
    }
}

#[test]
fn progress_sequences_are_exact() {
    let expected = [
        (StyleKind::Outline, vec![0.2, 0.4, 0.6, 0.8, 1.0]),
        (StyleKind::Sketch, vec![0.3, 0.5, 0.7, 0.9, 1.0]),
        (StyleKind::Cartoon, vec![0.2, 0.4, 0.6, 0.8, 1.0]),
    ];
    for (style, checkpoints) in expected {
        let recorder = ProgressRecorder::new();
        convert_with_observer(&drawing(20, 16), style, &defaults(), &recorder).unwrap();
        assert_eq!(recorder.fractions(), checkpoints, "{style}");
    }
}

#[test]
fn conversion_is_deterministic() {
    let image = drawing(24, 18);
    let params = ConversionParameters::new(4, 70, 30);
    for style in StyleKind::ALL {
        let a = convert(&image, style, &params).unwrap();
        let b = convert(&image, style, &params).unwrap();
        assert_eq!(a, b, "{style}");
    }
}

// ───── errors ─────

#[test]
fn zero_sized_input_is_invalid_for_every_style() {
    for style in StyleKind::ALL {
        let recorder = ProgressRecorder::new();
        let err = convert_with_observer(&RgbaImage::new(0, 4), style, &defaults(), &recorder)
            .unwrap_err();
        assert_eq!(
            err,
            ConversionError::InvalidInput(InvalidInput::ZeroSized {
                width: 0,
                height: 4
            })
        );
        assert!(recorder.fractions().is_empty());
    }
}

#[test]
fn corrupt_bytes_are_invalid_input() {
    for style in StyleKind::ALL {
        let err = convert_bytes(b"\x89PNG\r\n\x1a\nnope", style, &defaults()).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidInput(_)), "{err:?}");
        let err = convert_bytes(&[], style, &defaults()).unwrap_err();
        assert_eq!(err, ConversionError::InvalidInput(InvalidInput::EmptyData));
    }
}

#[test]
fn convert_bytes_matches_convert() {
    let image = drawing(16, 12);
    let bytes = encode_png(&image);
    for style in StyleKind::ALL {
        assert_eq!(
            convert_bytes(&bytes, style, &defaults()).unwrap(),
            convert(&image, style, &defaults()).unwrap()
        );
    }
}

#[test]
fn cancellation_stops_after_the_current_stage() {
    for style in StyleKind::ALL {
        let recorder = ProgressRecorder::cancelling_after(2);
        let err = convert_with_observer(&drawing(20, 20), style, &defaults(), &recorder)
            .unwrap_err();
        assert_eq!(err, ConversionError::Cancelled);
        assert_eq!(recorder.fractions(), style.checkpoints()[..2].to_vec());
    }
}

#[test]
fn cancelled_before_start_emits_nothing() {
    let recorder = ProgressRecorder::new();
    recorder.cancel();
    let err = convert_with_observer(&drawing(8, 8), StyleKind::Sketch, &defaults(), &recorder)
        .unwrap_err();
    assert_eq!(err, ConversionError::Cancelled);
    assert!(recorder.fractions().is_empty());
}

#[test]
fn out_of_range_parameters_do_not_fail() {
    let image = drawing(12, 12);
    for params in [
        ConversionParameters::new(0, 50, 50),
        ConversionParameters::new(-3, -20, -20),
        ConversionParameters::new(12, 150, 400),
        ConversionParameters::new(20_000, 50, 50),
        ConversionParameters::new(i32::MAX, i32::MAX, i32::MAX),
        ConversionParameters::new(i32::MIN, i32::MIN, i32::MIN),
    ] {
        for style in StyleKind::ALL {
            let out = convert(&image, style, &params).unwrap();
            assert_eq!(out.dimensions(), (12, 12));
        }
    }
}

// ───── Outline ─────

#[test]
fn outline_of_solid_color_is_near_white() {
    let image = RgbaImage::from_pixel(10, 10, Rgba([200, 40, 90, 255]));
    let out = convert(&image, StyleKind::Outline, &defaults()).unwrap();
    for px in out.pixels() {
        assert!(px.0[..3].iter().all(|&c| c >= 250), "{:?}", px.0);
        assert_eq!(px.0[3], 255);
    }
}

#[test]
fn outline_draws_dark_line_on_step() {
    let out = convert(&step_image(12, 8), StyleKind::Outline, &defaults()).unwrap();
    let line = out.get_pixel(5, 4).0[0];
    let paper = out.get_pixel(1, 4).0[0];
    assert!(line < 50, "line pixel {line}");
    assert_eq!(paper, 255);
}

#[test]
fn outline_zero_thickness_is_all_paper() {
    let params = ConversionParameters::new(0, 50, 50);
    let out = convert(&step_image(12, 8), StyleKind::Outline, &params).unwrap();
    assert!(out.pixels().all(|p| p.0 == [255, 255, 255, 255]));
}

// ───── Sketch ─────

#[test]
fn sketch_of_white_is_white() {
    let image = RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255]));
    let out = convert(&image, StyleKind::Sketch, &defaults()).unwrap();
    assert!(out.pixels().all(|p| p.0 == [255, 255, 255, 255]));
}

#[test]
fn sketch_of_black_dodges_to_white() {
    // Inverted blur of black is white, and dodging with a white
    // foreground saturates.
    let image = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255]));
    let out = convert(&image, StyleKind::Sketch, &defaults()).unwrap();
    assert!(out.pixels().all(|p| p.0 == [255, 255, 255, 255]));
}

#[test]
fn sketch_is_grayscale() {
    let out = convert(&drawing(20, 20), StyleKind::Sketch, &defaults()).unwrap();
    for px in out.pixels() {
        let [r, g, b, _] = px.0;
        assert!(r.abs_diff(g) <= 1 && g.abs_diff(b) <= 1, "{:?}", px.0);
    }
}

#[test]
fn sketch_zero_contrast_is_flat_gray() {
    let params = ConversionParameters::new(3, 0, 50);
    let out = convert(&drawing(16, 16), StyleKind::Sketch, &params).unwrap();
    assert!(out.pixels().all(|p| p.0 == [128, 128, 128, 255]));
}

#[test]
fn sketch_ignores_line_thickness() {
    let image = drawing(16, 16);
    let thin = convert(&image, StyleKind::Sketch, &ConversionParameters::new(1, 50, 50)).unwrap();
    let thick = convert(&image, StyleKind::Sketch, &ConversionParameters::new(5, 50, 50)).unwrap();
    assert_eq!(thin, thick);
}

// ───── Cartoon ─────

#[test]
fn cartoon_edge_occludes_color() {
    let params = ConversionParameters::new(5, 50, 50);
    let out = convert(&step_image(16, 10), StyleKind::Cartoon, &params).unwrap();
    assert_eq!(out.get_pixel(7, 5).0, [0, 0, 0, 255]);
    assert_eq!(out.get_pixel(8, 5).0, [0, 0, 0, 255]);
}

#[test]
fn cartoon_keeps_flat_color_away_from_edges() {
    let image = RgbaImage::from_pixel(12, 12, Rgba([220, 60, 40, 255]));
    let out = convert(&image, StyleKind::Cartoon, &defaults()).unwrap();
    for px in out.pixels() {
        for (got, want) in px.0.iter().zip([220u8, 60, 40, 255]) {
            assert!(got.abs_diff(want) <= 1, "{:?}", px.0);
        }
    }
}

#[test]
fn cartoon_zero_saturation_is_gray() {
    let image = RgbaImage::from_pixel(10, 10, Rgba([220, 60, 40, 255]));
    let out = convert(&image, StyleKind::Cartoon, &ConversionParameters::new(2, 50, 0)).unwrap();
    for px in out.pixels() {
        let [r, g, b, _] = px.0;
        assert!(r.abs_diff(g) <= 1 && g.abs_diff(b) <= 1, "{:?}", px.0);
    }
}

#[test]
fn cartoon_smoothing_removes_specks() {
    let mut image = RgbaImage::from_pixel(15, 15, Rgba([100, 150, 200, 255]));
    image.put_pixel(7, 7, Rgba([255, 0, 0, 255]));
    let params = ConversionParameters::new(2, 50, 50);
    let smoothed = kidsdraw_pipeline::median::median_smooth(&image, params.median_radius());
    assert_eq!(smoothed.get_pixel(7, 7).0, [100, 150, 200, 255]);
}

// ───── properties ─────

fn arb_image() -> impl Strategy<Value = RgbaImage> {
    (1u32..=12, 1u32..=12).prop_flat_map(|(w, h)| {
        proptest::collection::vec(any::<u8>(), (w * h * 4) as usize)
            .prop_map(move |raw| RgbaImage::from_raw(w, h, raw).unwrap_or_else(|| RgbaImage::new(w, h)))
    })
}

fn arb_style() -> impl Strategy<Value = StyleKind> {
    prop_oneof![
        Just(StyleKind::Outline),
        Just(StyleKind::Sketch),
        Just(StyleKind::Cartoon),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn any_image_converts_with_exact_progress(
        image in arb_image(),
        style in arb_style(),
        thickness in 1i32..=5,
        contrast in 0i32..=100,
        saturation in 0i32..=100,
    ) {
        let params = ConversionParameters::new(thickness, contrast, saturation);
        let recorder = ProgressRecorder::new();
        let out = convert_with_observer(&image, style, &params, &recorder).unwrap();
        prop_assert_eq!(out.dimensions(), image.dimensions());
        prop_assert_eq!(recorder.fractions(), style.checkpoints().to_vec());
    }
}
