//! Shared types for the kidsdraw style conversion pipeline.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can hand bitmaps to the
/// pipeline without depending on `image` directly.
pub use image::RgbaImage;

/// The bitmap type every stage consumes and produces: 8-bit straight
/// (non-premultiplied) RGBA.
///
/// Stage math is performed on normalized `f32` samples in `[0, 1]` and
/// quantized back to `u8` with rounding and clamping.
pub type Bitmap = RgbaImage;

/// Progress checkpoints for [`StyleKind::Outline`].
pub const OUTLINE_CHECKPOINTS: [f32; 5] = [0.2, 0.4, 0.6, 0.8, 1.0];

/// Progress checkpoints for [`StyleKind::Sketch`].
pub const SKETCH_CHECKPOINTS: [f32; 5] = [0.3, 0.5, 0.7, 0.9, 1.0];

/// Progress checkpoints for [`StyleKind::Cartoon`].
pub const CARTOON_CHECKPOINTS: [f32; 5] = [0.2, 0.4, 0.6, 0.8, 1.0];

/// Which fixed stage sequence a conversion runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleKind {
    /// Grayscale edge map, contrast-adjusted and inverted: dark lines on
    /// a light background.
    #[default]
    Outline,
    /// Classic pencil sketch: grayscale color-dodged with its own inverted
    /// blur.
    Sketch,
    /// Flat median-smoothed color with dark edge linework on top.
    Cartoon,
}

impl StyleKind {
    /// Every style, in the order the app presents them.
    pub const ALL: [Self; 3] = [Self::Outline, Self::Sketch, Self::Cartoon];

    /// Lowercase identifier used by serde, `Display`, and `FromStr`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Outline => "outline",
            Self::Sketch => "sketch",
            Self::Cartoon => "cartoon",
        }
    }

    /// The progress fractions emitted, in order, by a successful
    /// conversion in this style. The last entry is always `1.0`.
    #[must_use]
    pub const fn checkpoints(self) -> &'static [f32; 5] {
        match self {
            Self::Outline => &OUTLINE_CHECKPOINTS,
            Self::Sketch => &SKETCH_CHECKPOINTS,
            Self::Cartoon => &CARTOON_CHECKPOINTS,
        }
    }

    /// Names of the stage groups that precede each checkpoint.
    ///
    /// `stage_names()[i]` completes right before `checkpoints()[i]` is
    /// emitted.
    #[must_use]
    pub const fn stage_names(self) -> &'static [&'static str; 5] {
        match self {
            Self::Outline => &["validate", "desaturate", "edges", "contrast", "invert"],
            Self::Sketch => &["validate", "desaturate", "blur-invert", "dodge", "contrast"],
            Self::Cartoon => &["validate", "smooth", "linework", "color", "composite"],
        }
    }
}

impl fmt::Display for StyleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown style name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown style '{0}' (expected outline, sketch, or cartoon)")]
pub struct ParseStyleError(pub String);

impl FromStr for StyleKind {
    type Err = ParseStyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|style| style.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseStyleError(s.to_string()))
    }
}

/// User-chosen slider values for a conversion.
///
/// The conversion itself never clamps: out-of-range values flow into the
/// per-stage formulas as-is (a line thickness of 0 yields a zero-intensity
/// edge filter, a negative one is treated the same way). Callers that
/// want the app's ranges enforced use [`validate`](Self::validate) or
/// [`clamped`](Self::clamped) before submitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionParameters {
    /// Edge line weight, nominally 1 to 5. Scales edge intensity
    /// (`* 0.5`) and is the Cartoon median radius.
    pub line_thickness: i32,

    /// Contrast percentage, nominally 0 to 100. 50 is neutral.
    pub contrast: i32,

    /// Saturation percentage, nominally 0 to 100. 50 is neutral. Only the
    /// Cartoon style reads it.
    pub saturation: i32,
}

impl ConversionParameters {
    /// Default line thickness (the middle of the slider).
    pub const DEFAULT_LINE_THICKNESS: i32 = 3;
    /// Default contrast percentage (neutral).
    pub const DEFAULT_CONTRAST: i32 = 50;
    /// Default saturation percentage (neutral).
    pub const DEFAULT_SATURATION: i32 = 50;

    /// Accepted line thickness values.
    pub const LINE_THICKNESS_RANGE: RangeInclusive<i32> = 1..=5;
    /// Accepted contrast and saturation percentages.
    pub const PERCENT_RANGE: RangeInclusive<i32> = 0..=100;

    /// Percentage that maps to a factor of `1.0`.
    const NEUTRAL_PERCENT: f32 = 50.0;

    /// Create a parameter set. No range checking is performed.
    #[must_use]
    pub const fn new(line_thickness: i32, contrast: i32, saturation: i32) -> Self {
        Self {
            line_thickness,
            contrast,
            saturation,
        }
    }

    /// Check every field against the app's slider ranges.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range field as a [`ParameterError`].
    pub fn validate(&self) -> Result<(), ParameterError> {
        if !Self::LINE_THICKNESS_RANGE.contains(&self.line_thickness) {
            return Err(ParameterError::LineThickness(self.line_thickness));
        }
        if !Self::PERCENT_RANGE.contains(&self.contrast) {
            return Err(ParameterError::Contrast(self.contrast));
        }
        if !Self::PERCENT_RANGE.contains(&self.saturation) {
            return Err(ParameterError::Saturation(self.saturation));
        }
        Ok(())
    }

    /// Copy with every field clamped into its slider range.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            line_thickness: self.line_thickness.clamp(
                *Self::LINE_THICKNESS_RANGE.start(),
                *Self::LINE_THICKNESS_RANGE.end(),
            ),
            contrast: self
                .contrast
                .clamp(*Self::PERCENT_RANGE.start(), *Self::PERCENT_RANGE.end()),
            saturation: self
                .saturation
                .clamp(*Self::PERCENT_RANGE.start(), *Self::PERCENT_RANGE.end()),
        }
    }

    /// Edge detector intensity: `line_thickness * 0.5`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn edge_intensity(&self) -> f32 {
        self.line_thickness as f32 * 0.5
    }

    /// Contrast factor: `contrast / 50`. 50 → 1.0 (neutral), 0 → 0.0
    /// (flat mid-gray), 100 → 2.0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn contrast_factor(&self) -> f32 {
        self.contrast as f32 / Self::NEUTRAL_PERCENT
    }

    /// Saturation factor: `saturation / 50`. 50 → 1.0 (neutral), 0 → 0.0
    /// (grayscale), 100 → 2.0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn saturation_factor(&self) -> f32 {
        self.saturation as f32 / Self::NEUTRAL_PERCENT
    }

    /// Cartoon median filter radius: the line thickness, floored at 0.
    #[must_use]
    pub fn median_radius(&self) -> u32 {
        u32::try_from(self.line_thickness).unwrap_or(0)
    }
}

impl Default for ConversionParameters {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_LINE_THICKNESS,
            Self::DEFAULT_CONTRAST,
            Self::DEFAULT_SATURATION,
        )
    }
}

/// A [`ConversionParameters`] field outside the app's slider range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParameterError {
    /// Line thickness outside `1..=5`.
    #[error("line thickness {0} is outside 1..=5")]
    LineThickness(i32),
    /// Contrast outside `0..=100`.
    #[error("contrast {0} is outside 0..=100")]
    Contrast(i32),
    /// Saturation outside `0..=100`.
    #[error("saturation {0} is outside 0..=100")]
    Saturation(i32),
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an existing bitmap.
    #[must_use]
    pub fn of(image: &RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height }
    }

    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether either side is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Why an input could not be interpreted as a pixel grid.
///
/// Decoder errors are carried as their `Display` string so the whole
/// error type stays `Clone` and serde-compatible across thread and
/// process boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum InvalidInput {
    /// The encoded image bytes were empty.
    #[error("input image data is empty")]
    EmptyData,

    /// The image format is unrecognized or the data is corrupt.
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// The bitmap has zero width or height.
    #[error("image has zero area ({width}x{height})")]
    ZeroSized {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },

    /// A raw pixel buffer does not match its declared dimensions.
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSize {
        /// `width * height * 4`.
        expected: u64,
        /// Length of the supplied buffer.
        actual: u64,
    },
}

impl From<image::ImageError> for InvalidInput {
    fn from(err: image::ImageError) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Terminal failure of a conversion call. No partial bitmap is ever
/// returned alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ConversionError {
    /// The supplied image cannot be interpreted as a pixel grid.
    #[error("invalid input image: {0}")]
    InvalidInput(#[from] InvalidInput),

    /// A stage's operator produced no usable output.
    #[error("stage '{stage}' failed: {reason}")]
    ProcessingFailed {
        /// Name of the failing stage (see [`StyleKind::stage_names`]).
        stage: String,
        /// Operator-specific detail.
        reason: String,
    },

    /// The caller requested cancellation before a stage started.
    #[error("conversion was cancelled")]
    Cancelled,
}

impl ConversionError {
    /// Build a [`ConversionError::ProcessingFailed`].
    #[must_use]
    pub fn processing_failed(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProcessingFailed {
            stage: stage.into(),
            reason: reason.into(),
        }
    }
}
