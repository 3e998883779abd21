//! Handles returned by [`StyleConversionEngine::submit`].
//!
//! [`StyleConversionEngine::submit`]: crate::StyleConversionEngine::submit

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use kidsdraw_pipeline::{Bitmap, ConversionError};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::error::EngineError;

/// Per-engine job number, increasing in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Stream of one job's progress checkpoints.
///
/// Yields every checkpoint the job emits, in order, then `None` once the
/// job has finished (successfully or not).
#[derive(Debug)]
pub struct ProgressHandle {
    rx: mpsc::UnboundedReceiver<f32>,
}

impl ProgressHandle {
    pub(crate) const fn new(rx: mpsc::UnboundedReceiver<f32>) -> Self {
        Self { rx }
    }

    /// Wait for the next checkpoint.
    pub async fn next(&mut self) -> Option<f32> {
        self.rx.recv().await
    }

    /// Take a checkpoint if one is already buffered.
    pub fn try_next(&mut self) -> Option<f32> {
        self.rx.try_recv().ok()
    }

    /// Blocking variant of [`next`](Self::next) for synchronous callers.
    /// Must not be called from inside an async runtime.
    pub fn blocking_next(&mut self) -> Option<f32> {
        self.rx.blocking_recv()
    }
}

/// Cloneable cancellation switch for one job.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Ask the job to stop before its next stage.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// An in-flight conversion.
///
/// Dropping it without awaiting the result cancels the job.
#[derive(Debug)]
pub struct Conversion {
    pub(crate) id: JobId,
    pub(crate) progress: ProgressHandle,
    pub(crate) cancel: CancelHandle,
    pub(crate) result: oneshot::Receiver<Result<Bitmap, ConversionError>>,
}

impl Conversion {
    /// This job's id.
    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// This job's progress stream.
    pub const fn progress(&mut self) -> &mut ProgressHandle {
        &mut self.progress
    }

    /// Request cooperative cancellation. The job stops before its next
    /// stage and resolves to [`ConversionError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A cancellation switch that outlives `self`.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Wait for the job's terminal result.
    ///
    /// # Errors
    ///
    /// [`EngineError::Conversion`] if the conversion failed or was
    /// cancelled, [`EngineError::WorkerStopped`] if the worker went away.
    pub async fn result(self) -> Result<Bitmap, EngineError> {
        self.result
            .await
            .map_err(|_| EngineError::WorkerStopped)?
            .map_err(EngineError::Conversion)
    }

    /// Blocking variant of [`result`](Self::result). Must not be called
    /// from inside an async runtime.
    ///
    /// # Errors
    ///
    /// Same as [`result`](Self::result).
    pub fn wait(self) -> Result<Bitmap, EngineError> {
        self.result
            .blocking_recv()
            .map_err(|_| EngineError::WorkerStopped)?
            .map_err(EngineError::Conversion)
    }
}
