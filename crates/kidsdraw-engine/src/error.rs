//! Engine error type.

use std::io;

use kidsdraw_pipeline::ConversionError;

/// Errors from submitting to or running on a [`StyleConversionEngine`].
///
/// [`StyleConversionEngine`]: crate::StyleConversionEngine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The worker thread could not be started.
    #[error("failed to spawn conversion worker: {0}")]
    Spawn(#[source] io::Error),

    /// Too many jobs are already waiting.
    #[error("conversion queue is full ({capacity} jobs pending)")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// The worker exited before finishing the job.
    #[error("conversion worker has stopped")]
    WorkerStopped,

    /// The conversion itself failed.
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

impl EngineError {
    /// The underlying conversion error, if that is what this is.
    #[must_use]
    pub const fn as_conversion(&self) -> Option<&ConversionError> {
        match self {
            Self::Conversion(err) => Some(err),
            _ => None,
        }
    }

    /// Whether the job ended because it was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Conversion(ConversionError::Cancelled))
    }
}
