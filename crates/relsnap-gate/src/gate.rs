//! Concurrency gate
//!
//! Submissions go into an unbounded FIFO queue drained by a single
//! dispatcher task. The dispatcher takes one semaphore permit per job before
//! spawning it, so jobs start in submission order and never more than
//! `capacity` run at once.
//!
//! Completion is tracked by one `outstanding` counter covering queued work,
//! executing work and open `GateHold`s. When it returns to zero the idle
//! signal fires, once, and the gate stops accepting work.

use crate::error::GateError;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot, watch, Semaphore};

type Job = BoxFuture<'static, ()>;
type ErrorHook = Arc<dyn Fn(&WorkFailure) + Send + Sync>;

/// A unit of work that failed, as seen by the work-error hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkFailure {
    /// Label given at submission
    pub label: String,
    /// Rendered error or panic message
    pub message: String,
    /// Whether the work panicked rather than returning an error
    pub panicked: bool,
}

/// Gate counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateStats {
    /// Configured capacity
    pub capacity: usize,
    /// Work accepted into the queue
    pub submitted: usize,
    /// Work that returned `Ok`
    pub succeeded: usize,
    /// Work that returned `Err` or panicked
    pub failed: usize,
    /// Highest number of simultaneously executing units observed
    pub peak_executing: usize,
}

/// Builder for `ConcurrencyGate`
pub struct GateBuilder {
    capacity: usize,
    on_work_error: Option<ErrorHook>,
}

impl GateBuilder {
    /// Start building a gate admitting `capacity` concurrent units
    #[inline]
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            on_work_error: None,
        }
    }

    /// Register the work-error hook
    ///
    /// Called from the task that ran the failed work. Must not block.
    #[must_use]
    pub fn on_work_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&WorkFailure) + Send + Sync + 'static,
    {
        self.on_work_error = Some(Arc::new(hook));
        self
    }

    /// Build the gate and start its dispatcher
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// `GateError::ZeroCapacity` if capacity is zero.
    pub fn build(self) -> Result<ConcurrencyGate, GateError> {
        if self.capacity == 0 {
            return Err(GateError::ZeroCapacity);
        }

        let (idle_tx, _) = watch::channel(false);
        let shared = Arc::new(Shared {
            capacity: self.capacity,
            outstanding: AtomicUsize::new(0),
            executing: AtomicUsize::new(0),
            submitted: AtomicUsize::new(0),
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            peak_executing: AtomicUsize::new(0),
            idle_fired: AtomicBool::new(false),
            idle_tx,
            on_work_error: self.on_work_error,
        });

        let (queue, rx) = mpsc::unbounded_channel();
        tokio::spawn(dispatch(Arc::clone(&shared), rx));

        Ok(ConcurrencyGate { shared, queue })
    }
}

impl fmt::Debug for GateBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateBuilder")
            .field("capacity", &self.capacity)
            .field("on_work_error", &self.on_work_error.is_some())
            .finish()
    }
}

/// Bounded FIFO worker pool
#[derive(Clone)]
pub struct ConcurrencyGate {
    shared: Arc<Shared>,
    queue: mpsc::UnboundedSender<Job>,
}

impl ConcurrencyGate {
    /// Gate builder
    #[inline]
    #[must_use]
    pub fn builder(capacity: usize) -> GateBuilder {
        GateBuilder::new(capacity)
    }

    /// Gate without a work-error hook
    ///
    /// # Errors
    /// `GateError::ZeroCapacity` if capacity is zero.
    pub fn new(capacity: usize) -> Result<Self, GateError> {
        GateBuilder::new(capacity).build()
    }

    /// Queue `work` for execution
    ///
    /// `work` is not called until a slot is free. The returned `Submission`
    /// resolves to the work's own result, or to a `GateError` if it panicked
    /// or the gate was already idle. Dropping the `Submission` does not
    /// cancel the work.
    pub fn submit<F, Fut, T, E>(&self, label: impl Into<String>, work: F) -> Submission<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let label = label.into();
        let (tx, rx) = oneshot::channel();

        if self.shared.idle_fired.load(Ordering::Acquire) {
            let _ = tx.send(Err(GateError::Closed));
            return Submission { rx };
        }

        self.shared.submitted.fetch_add(1, Ordering::Relaxed);
        self.shared.outstanding.fetch_add(1, Ordering::AcqRel);

        let shared = Arc::clone(&self.shared);
        let job = async move {
            let outcome = AssertUnwindSafe(async move { work().await })
                .catch_unwind()
                .await;

            let settled = match outcome {
                Ok(Ok(value)) => {
                    shared.succeeded.fetch_add(1, Ordering::Relaxed);
                    Ok(Ok(value))
                }
                Ok(Err(err)) => {
                    shared.report(&WorkFailure {
                        label,
                        message: err.to_string(),
                        panicked: false,
                    });
                    Ok(Err(err))
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    shared.report(&WorkFailure {
                        label: label.clone(),
                        message: message.clone(),
                        panicked: true,
                    });
                    Err(GateError::Panicked { label, message })
                }
            };

            let _ = tx.send(settled);
        }
        .boxed();

        if self.queue.send(job).is_err() {
            // Dispatcher is gone; the rejected job (and its sender) is dropped
            // here, so the submission resolves to `Dropped`.
            self.shared.settle();
        }

        Submission { rx }
    }

    /// Keep the gate from going idle until the returned guard is dropped
    ///
    /// Hold the gate while submitting a batch so that early completions
    /// cannot trigger the idle signal before the last submission.
    #[must_use = "the hold is released as soon as it is dropped"]
    pub fn hold(&self) -> GateHold {
        self.shared.outstanding.fetch_add(1, Ordering::AcqRel);
        GateHold {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Resolves with the final counters once the gate goes idle
    pub fn on_idle(&self) -> impl Future<Output = GateStats> + Send + 'static {
        let shared = Arc::clone(&self.shared);
        let mut idle = shared.idle_tx.subscribe();
        async move {
            // The sender lives in `shared`, so the channel outlives this wait.
            let _ = idle.wait_for(|fired| *fired).await;
            shared.stats()
        }
    }

    /// Whether the idle signal has fired
    #[inline]
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.shared.idle_fired.load(Ordering::Acquire)
    }

    /// Configured capacity
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Current counters
    #[inline]
    #[must_use]
    pub fn stats(&self) -> GateStats {
        self.shared.stats()
    }
}

impl fmt::Debug for ConcurrencyGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrencyGate")
            .field("stats", &self.stats())
            .field("idle", &self.is_idle())
            .finish_non_exhaustive()
    }
}

/// Guard returned by `ConcurrencyGate::hold`
pub struct GateHold {
    shared: Arc<Shared>,
}

impl Drop for GateHold {
    fn drop(&mut self) {
        self.shared.settle();
    }
}

impl fmt::Debug for GateHold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateHold").finish_non_exhaustive()
    }
}

/// Pending result of submitted work
#[derive(Debug)]
pub struct Submission<T, E> {
    rx: oneshot::Receiver<Result<Result<T, E>, GateError>>,
}

impl<T, E> Future for Submission<T, E> {
    type Output = Result<Result<T, E>, GateError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.rx
            .poll_unpin(cx)
            .map(|received| received.unwrap_or(Err(GateError::Dropped)))
    }
}

struct Shared {
    capacity: usize,
    outstanding: AtomicUsize,
    executing: AtomicUsize,
    submitted: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    peak_executing: AtomicUsize,
    idle_fired: AtomicBool,
    idle_tx: watch::Sender<bool>,
    on_work_error: Option<ErrorHook>,
}

impl Shared {
    fn begin(&self) {
        let now = self.executing.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_executing.fetch_max(now, Ordering::AcqRel);
    }

    fn end(&self) {
        self.executing.fetch_sub(1, Ordering::AcqRel);
    }

    fn settle(&self) {
        if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.fire_idle();
        }
    }

    fn fire_idle(&self) {
        if !self.idle_fired.swap(true, Ordering::AcqRel) {
            tracing::debug!(
                submitted = self.submitted.load(Ordering::Relaxed),
                failed = self.failed.load(Ordering::Relaxed),
                "concurrency gate idle"
            );
            self.idle_tx.send_replace(true);
        }
    }

    fn report(&self, failure: &WorkFailure) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        if let Some(hook) = &self.on_work_error {
            hook(failure);
        }
    }

    fn stats(&self) -> GateStats {
        GateStats {
            capacity: self.capacity,
            submitted: self.submitted.load(Ordering::Acquire),
            succeeded: self.succeeded.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
            peak_executing: self.peak_executing.load(Ordering::Acquire),
        }
    }
}

/// Dispatcher loop: admit queued jobs one permit at a time
async fn dispatch(shared: Arc<Shared>, mut queue: mpsc::UnboundedReceiver<Job>) {
    let permits = Arc::new(Semaphore::new(shared.capacity));

    while let Some(job) = queue.recv().await {
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        let shared = Arc::clone(&shared);
        tokio::spawn(async move {
            shared.begin();
            job.await;
            shared.end();
            drop(permit);
            shared.settle();
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
