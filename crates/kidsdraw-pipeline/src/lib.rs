//! kidsdraw-pipeline: pure image style conversion (sans-IO).
//!
//! Turns an RGBA bitmap into one of three drawing-sheet styles:
//!
//! - **Outline**: grayscale → edges → contrast → invert
//! - **Sketch**: grayscale → inverted blur → color dodge → contrast
//! - **Cartoon**: median smoothing + color controls, with dark edge
//!   linework composited on top
//!
//! Every conversion reports a fixed sequence of progress checkpoints to
//! an [`Observer`] and polls it for cancellation between stages. The
//! output always has the input's dimensions.
//!
//! This crate does no I/O and spawns no threads. Background execution
//! lives in `kidsdraw-engine`; persistence in `kidsdraw-store`.

pub mod blend;
pub mod blur;
pub mod color;
pub mod decode;
pub mod diagnostics;
pub mod edge;
pub mod median;
pub mod progress;
mod sample;
pub mod style;
pub mod types;

pub use diagnostics::{Clock, ConversionDiagnostics, StageDiagnostics, convert_with_diagnostics};
pub use progress::{FnObserver, NoopObserver, Observer, ProgressRecorder};
pub use types::{
    Bitmap, ConversionError, ConversionParameters, Dimensions, InvalidInput, ParameterError,
    ParseStyleError, RgbaImage, StyleKind,
};

use diagnostics::NullClock;
use style::StageRunner;

/// Convert `image` to `style`.
///
/// # Errors
///
/// Returns [`ConversionError::InvalidInput`] for a zero-sized image and
/// [`ConversionError::ProcessingFailed`] if an operator produces no
/// usable output.
pub fn convert(
    image: &Bitmap,
    style: StyleKind,
    params: &ConversionParameters,
) -> Result<Bitmap, ConversionError> {
    convert_with_observer(image, style, params, &NoopObserver)
}

/// Convert `image`, reporting each checkpoint of
/// [`StyleKind::checkpoints`] to `observer` and polling it for
/// cancellation before every stage.
///
/// On success the observer has seen the full checkpoint sequence, ending
/// with `1.0`. On failure it has seen a prefix of it.
///
/// # Errors
///
/// As [`convert`], plus [`ConversionError::Cancelled`] when the observer
/// requests cancellation.
pub fn convert_with_observer(
    image: &Bitmap,
    style: StyleKind,
    params: &ConversionParameters,
    observer: &dyn Observer,
) -> Result<Bitmap, ConversionError> {
    let mut runner = StageRunner::new(style, observer, &NullClock);
    style::run(image, style, params, &mut runner)
}

/// Decode encoded image bytes and convert them.
///
/// # Errors
///
/// Returns [`ConversionError::InvalidInput`] for empty, corrupt, or
/// zero-sized input, otherwise as [`convert`].
pub fn convert_bytes(
    bytes: &[u8],
    style: StyleKind,
    params: &ConversionParameters,
) -> Result<Bitmap, ConversionError> {
    let image = decode::decode(bytes)?;
    convert(&image, style, params)
}
