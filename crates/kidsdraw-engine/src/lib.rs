//! kidsdraw-engine: off-thread style conversion.
//!
//! [`StyleConversionEngine`] owns one worker thread that runs
//! `kidsdraw-pipeline` conversions in submission order. Each submission
//! returns a [`Conversion`] with its own progress stream, a cancel
//! switch, and the eventual result. A shared [`tokio::sync::watch`]
//! publisher mirrors the progress of whichever job is running.

mod conversion;
mod engine;
mod error;

pub use conversion::{CancelHandle, Conversion, JobId, ProgressHandle};
pub use engine::{EngineConfig, StyleConversionEngine};
pub use error::EngineError;
pub use kidsdraw_pipeline::{Bitmap, ConversionError, ConversionParameters, StyleKind};
