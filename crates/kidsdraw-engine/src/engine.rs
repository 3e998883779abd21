//! The background conversion worker.
//!
//! One named OS thread owns the job queue and runs conversions strictly
//! one at a time, in submission order. Callers talk to it through tokio
//! channels, so they can await results from async code or block from
//! plain threads.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use kidsdraw_pipeline::{
    Bitmap, ConversionError, ConversionParameters, Observer, StyleKind, convert_with_observer,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};

use crate::conversion::{CancelHandle, Conversion, JobId, ProgressHandle};
use crate::error::EngineError;

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name given to the worker thread.
    pub worker_name: String,
    /// Jobs that may wait behind the running one before
    /// [`EngineError::QueueFull`]. Values below 1 are treated as 1.
    pub queue_capacity: usize,
}

impl EngineConfig {
    /// Default worker thread name.
    pub const DEFAULT_WORKER_NAME: &'static str = "kidsdraw-convert";
    /// Default queue capacity.
    pub const DEFAULT_QUEUE_CAPACITY: usize = 16;
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_name: Self::DEFAULT_WORKER_NAME.to_string(),
            queue_capacity: Self::DEFAULT_QUEUE_CAPACITY,
        }
    }
}

struct Job {
    id: JobId,
    image: Bitmap,
    style: StyleKind,
    params: ConversionParameters,
    progress: mpsc::UnboundedSender<f32>,
    cancel: CancelHandle,
    result: oneshot::Sender<Result<Bitmap, ConversionError>>,
}

/// Forwards checkpoints to the job's own stream and to the shared
/// publisher. Cancels when asked to or when nobody is waiting for the
/// result any more.
struct JobObserver<'a> {
    progress: &'a mpsc::UnboundedSender<f32>,
    shared: &'a watch::Sender<f32>,
    cancel: &'a CancelHandle,
    result: &'a oneshot::Sender<Result<Bitmap, ConversionError>>,
}

impl Observer for JobObserver<'_> {
    fn progress(&self, fraction: f32) {
        // The per-call receiver may already be gone.
        self.progress.send(fraction).ok();
        self.shared.send_replace(fraction);
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.result.is_closed()
    }
}

/// Runs style conversions on a dedicated background thread.
///
/// Dropping the engine closes the queue, lets queued jobs finish, and
/// joins the worker. If the worker thread panicked, the panic is resumed
/// on the dropping thread.
///
/// The join blocks the dropping thread until every queued job whose
/// [`Conversion`] is still alive has run. From async code, drop the
/// engine inside [`tokio::task::spawn_blocking`] so a runtime worker is
/// not stalled.
pub struct StyleConversionEngine {
    jobs: Option<mpsc::Sender<Job>>,
    worker: Option<JoinHandle<()>>,
    shared: Arc<watch::Sender<f32>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl StyleConversionEngine {
    /// Start an engine with [`EngineConfig::default`].
    ///
    /// # Errors
    ///
    /// [`EngineError::Spawn`] if the worker thread cannot be started.
    pub fn new() -> Result<Self, EngineError> {
        Self::with_config(EngineConfig::default())
    }

    /// Start an engine with explicit settings.
    ///
    /// # Errors
    ///
    /// [`EngineError::Spawn`] if the worker thread cannot be started.
    pub fn with_config(config: EngineConfig) -> Result<Self, EngineError> {
        let capacity = config.queue_capacity.max(1);
        let (jobs, mut queue) = mpsc::channel::<Job>(capacity);
        let (shared, _) = watch::channel(0.0_f32);
        let shared = Arc::new(shared);

        let worker_shared = Arc::clone(&shared);
        let name = config.worker_name.clone();
        let worker = thread::Builder::new()
            .name(config.worker_name)
            .spawn(move || {
                tracing::debug!(worker = %name, "conversion worker starting");
                while let Some(job) = queue.blocking_recv() {
                    run_job(job, &worker_shared);
                }
                tracing::debug!(worker = %name, "conversion worker exiting");
            })
            .map_err(EngineError::Spawn)?;

        Ok(Self {
            jobs: Some(jobs),
            worker: Some(worker),
            shared,
            next_id: AtomicU64::new(1),
            capacity,
        })
    }

    /// Queue a conversion and return immediately.
    ///
    /// # Errors
    ///
    /// [`EngineError::QueueFull`] if `queue_capacity` jobs are already
    /// waiting, [`EngineError::WorkerStopped`] if the worker has exited.
    pub fn submit(
        &self,
        image: Bitmap,
        style: StyleKind,
        params: ConversionParameters,
    ) -> Result<Conversion, EngineError> {
        let jobs = self.jobs.as_ref().ok_or(EngineError::WorkerStopped)?;

        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = oneshot::channel();
        let cancel = CancelHandle::default();

        tracing::debug!(
            job = %id,
            %style,
            width = image.width(),
            height = image.height(),
            "queueing conversion"
        );

        jobs.try_send(Job {
            id,
            image,
            style,
            params,
            progress: progress_tx,
            cancel: cancel.clone(),
            result: result_tx,
        })
        .map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => EngineError::QueueFull {
                capacity: self.capacity,
            },
            mpsc::error::TrySendError::Closed(_) => EngineError::WorkerStopped,
        })?;

        Ok(Conversion {
            id,
            progress: ProgressHandle::new(progress_rx),
            cancel,
            result: result_rx,
        })
    }

    /// Submit a conversion and wait for its result.
    ///
    /// # Errors
    ///
    /// Any error from [`submit`](Self::submit) or
    /// [`Conversion::result`].
    pub async fn convert(
        &self,
        image: Bitmap,
        style: StyleKind,
        params: ConversionParameters,
    ) -> Result<Bitmap, EngineError> {
        self.submit(image, style, params)?.result().await
    }

    /// Subscribe to the shared progress publisher.
    ///
    /// Every job resets it to `0.0` when it starts and then publishes each
    /// of its checkpoints. Only the latest value is kept; use
    /// [`Conversion::progress`] for the full per-job sequence.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<f32> {
        self.shared.subscribe()
    }
}

impl Drop for StyleConversionEngine {
    fn drop(&mut self) {
        drop(self.jobs.take());

        if let Some(worker) = self.worker.take()
            && let Err(payload) = worker.join()
            && !thread::panicking()
        {
            resume_unwind(payload);
        }
    }
}

fn run_job(job: Job, shared: &watch::Sender<f32>) {
    let Job {
        id,
        image,
        style,
        params,
        progress,
        cancel,
        result,
    } = job;

    if result.is_closed() {
        tracing::debug!(job = %id, "skipping conversion nobody is waiting for");
        return;
    }

    shared.send_replace(0.0);
    let started = Instant::now();

    let observer = JobObserver {
        progress: &progress,
        shared,
        cancel: &cancel,
        result: &result,
    };
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        convert_with_observer(&image, style, &params, &observer)
    }))
    .unwrap_or_else(|payload| {
        Err(ConversionError::processing_failed(
            style.name(),
            panic_message(payload.as_ref()),
        ))
    });

    match &outcome {
        Ok(_) => tracing::info!(
            job = %id,
            %style,
            width = image.width(),
            height = image.height(),
            elapsed = ?started.elapsed(),
            "conversion finished"
        ),
        Err(ConversionError::Cancelled) => {
            tracing::info!(job = %id, %style, "conversion cancelled");
        }
        Err(err) => tracing::warn!(job = %id, %style, error = %err, "conversion failed"),
    }

    // The caller may have given up on the result.
    result.send(outcome).ok();
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "operator panicked".to_string())
}
