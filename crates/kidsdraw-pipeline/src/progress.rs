//! Progress reporting and cooperative cancellation.
//!
//! A conversion reports each checkpoint from [`StyleKind::checkpoints`]
//! to an [`Observer`] and asks it, before every stage, whether the caller
//! has given up.
//!
//! [`StyleKind::checkpoints`]: crate::StyleKind::checkpoints

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Receives progress checkpoints and answers cancellation polls.
pub trait Observer {
    /// Called with each checkpoint fraction, in order.
    fn progress(&self, fraction: f32);

    /// Polled before each stage. Returning `true` stops the conversion
    /// with [`ConversionError::Cancelled`](crate::ConversionError::Cancelled).
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Ignores progress and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn progress(&self, _fraction: f32) {}
}

/// Adapts a closure into an [`Observer`] that never cancels.
pub struct FnObserver<F>(pub F);

impl<F: Fn(f32)> Observer for FnObserver<F> {
    fn progress(&self, fraction: f32) {
        (self.0)(fraction);
    }
}

/// Records every fraction it sees and cancels once
/// [`cancel`](Self::cancel) has been called.
#[derive(Debug, Default)]
pub struct ProgressRecorder {
    fractions: Mutex<Vec<f32>>,
    cancelled: AtomicBool,
    cancel_after: Option<usize>,
}

impl ProgressRecorder {
    /// A recorder that never cancels on its own.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder that requests cancellation once it has seen `count`
    /// checkpoints. Used to exercise mid-conversion cancellation in tests.
    #[doc(hidden)]
    #[must_use]
    pub fn cancelling_after(count: usize) -> Self {
        Self {
            cancel_after: Some(count),
            ..Self::default()
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Fractions seen so far.
    #[must_use]
    pub fn fractions(&self) -> Vec<f32> {
        self.fractions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Observer for ProgressRecorder {
    fn progress(&self, fraction: f32) {
        let mut fractions = self.fractions.lock().unwrap_or_else(PoisonError::into_inner);
        fractions.push(fraction);
        if self.cancel_after.is_some_and(|n| fractions.len() >= n) {
            self.cancel();
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
