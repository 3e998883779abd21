//! Side-by-side share image: original on the left, converted artwork on
//! the right, on a white card with a header band.

use kidsdraw_pipeline::{Bitmap, Dimensions};
use tiny_skia::{Color, ColorU8, Paint, Pixmap, PixmapPaint, Rect, Transform};

use crate::error::StoreError;

/// Height of the header band above the images.
pub const HEADER_HEIGHT: u32 = 40;
/// Gap around and between the images.
pub const MARGIN: u32 = 10;
/// Space below the images.
pub const FOOTER_HEIGHT: u32 = 20;

/// Header rule color.
const RULE_GRAY: u8 = 220;

/// Where each image lands on the share canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareLayout {
    /// Canvas width.
    pub width: u32,
    /// Canvas height.
    pub height: u32,
    /// Top-left corner of the original.
    pub original_origin: (u32, u32),
    /// Top-left corner of the converted image.
    pub sketch_origin: (u32, u32),
}

impl ShareLayout {
    /// Layout for the given image sizes.
    #[must_use]
    pub fn for_sizes(original: Dimensions, sketch: Dimensions) -> Self {
        Self {
            width: original.width + sketch.width + 3 * MARGIN,
            height: HEADER_HEIGHT + original.height.max(sketch.height) + FOOTER_HEIGHT,
            original_origin: (MARGIN, HEADER_HEIGHT),
            sketch_origin: (original.width + 2 * MARGIN, HEADER_HEIGHT),
        }
    }
}

/// Compose `original` and `sketch` side by side.
///
/// # Errors
///
/// [`StoreError::Compose`] if either image is empty or the canvas is too
/// large to allocate.
pub fn compose_share_image(original: &Bitmap, sketch: &Bitmap) -> Result<Bitmap, StoreError> {
    let layout = ShareLayout::for_sizes(Dimensions::of(original), Dimensions::of(sketch));

    let mut canvas = Pixmap::new(layout.width, layout.height).ok_or_else(|| {
        StoreError::Compose(format!(
            "cannot allocate {}x{} canvas",
            layout.width, layout.height
        ))
    })?;
    canvas.fill(Color::WHITE);

    let mut paint = Paint::default();
    paint.set_color_rgba8(RULE_GRAY, RULE_GRAY, RULE_GRAY, 255);
    paint.anti_alias = false;
    #[allow(clippy::cast_precision_loss)]
    let rule = Rect::from_xywh(
        MARGIN as f32,
        (HEADER_HEIGHT - MARGIN / 2) as f32,
        (layout.width - 2 * MARGIN) as f32,
        1.0,
    );
    if let Some(rule) = rule {
        canvas.fill_rect(rule, &paint, Transform::identity(), None);
    }

    for (bitmap, (x, y)) in [
        (original, layout.original_origin),
        (sketch, layout.sketch_origin),
    ] {
        let layer = to_pixmap(bitmap)?;
        canvas.draw_pixmap(
            to_i32(x)?,
            to_i32(y)?,
            layer.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }

    tracing::debug!(width = layout.width, height = layout.height, "composed share image");
    Ok(from_pixmap(&canvas))
}

/// Straight RGBA → premultiplied pixmap.
fn to_pixmap(bitmap: &Bitmap) -> Result<Pixmap, StoreError> {
    let (w, h) = bitmap.dimensions();
    let mut pixmap = Pixmap::new(w, h)
        .ok_or_else(|| StoreError::Compose(format!("cannot draw a {w}x{h} image")))?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(bitmap.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

/// Premultiplied pixmap → straight RGBA.
fn from_pixmap(pixmap: &Pixmap) -> Bitmap {
    let mut bitmap = Bitmap::new(pixmap.width(), pixmap.height());
    for (dst, src) in bitmap.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    bitmap
}

fn to_i32(v: u32) -> Result<i32, StoreError> {
    i32::try_from(v).map_err(|_| StoreError::Compose(format!("offset {v} out of range")))
}
