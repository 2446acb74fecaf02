//! Bounded-concurrency task executor.
//!
//! Submissions go through a single FIFO channel to a dispatcher task, which
//! acquires a slot before spawning each job. At most `limit` jobs run at
//! once and queued jobs start in submission order.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot, OwnedSemaphorePermit, Semaphore};

type ProcessFn<I, O, E> = dyn Fn(I) -> BoxFuture<'static, Result<O, E>> + Send + Sync;

/// A job ended without producing a result (it panicked, or the runtime shut
/// down before it could run).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("task ended without producing a result")]
pub struct TaskAborted;

struct Submission<I, O, E> {
    input: I,
    reply: oneshot::Sender<Result<O, E>>,
}

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicUsize,
    running: AtomicUsize,
}

/// Releases a slot when a job finishes, including by panic.
struct Slot {
    counters: Arc<Counters>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.counters.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs `process(input)` for each submitted input, at most `limit` at a time.
///
/// Cloning is cheap; clones share the same queue and slots.
pub struct TaskExecutor<I, O, E> {
    tx: mpsc::UnboundedSender<Submission<I, O, E>>,
    counters: Arc<Counters>,
    limit: usize,
}

impl<I, O, E> Clone for TaskExecutor<I, O, E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            counters: Arc::clone(&self.counters),
            limit: self.limit,
        }
    }
}

impl<I, O, E> fmt::Debug for TaskExecutor<I, O, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskExecutor")
            .field("limit", &self.limit)
            .field("queued", &self.queued())
            .field("running", &self.running())
            .finish()
    }
}

impl<I, O, E> TaskExecutor<I, O, E>
where
    I: Send + 'static,
    O: Send + 'static,
    E: From<TaskAborted> + Send + 'static,
{
    /// Create an executor running `process` with at most `limit` concurrent
    /// jobs. A `limit` of zero is treated as one.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new<F, Fut>(limit: usize, process: F) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, E>> + Send + 'static,
    {
        let limit = limit.max(1);
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        let process: Arc<ProcessFn<I, O, E>> = Arc::new(move |input: I| process(input).boxed());

        tokio::spawn(dispatch(
            rx,
            Arc::new(Semaphore::new(limit)),
            process,
            Arc::clone(&counters),
        ));

        Self {
            tx,
            counters,
            limit,
        }
    }

    /// Queue `input` and return a handle resolving to the job's result.
    ///
    /// Dropping the handle does not cancel the job.
    pub fn execute(&self, input: I) -> TaskHandle<O, E> {
        let (reply, rx) = oneshot::channel();
        self.counters.queued.fetch_add(1, Ordering::SeqCst);

        if self.tx.send(Submission { input, reply }).is_err() {
            // Dispatcher is gone; the dropped reply resolves the handle as aborted.
            self.counters.queued.fetch_sub(1, Ordering::SeqCst);
            tracing::warn!("Task executor is shut down; job not queued");
        }

        TaskHandle { rx }
    }
}

impl<I, O, E> TaskExecutor<I, O, E> {
    /// Maximum number of concurrently running jobs.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Jobs waiting for a slot.
    pub fn queued(&self) -> usize {
        self.counters.queued.load(Ordering::SeqCst)
    }

    /// Jobs currently running.
    pub fn running(&self) -> usize {
        self.counters.running.load(Ordering::SeqCst)
    }
}

async fn dispatch<I, O, E>(
    mut rx: mpsc::UnboundedReceiver<Submission<I, O, E>>,
    slots: Arc<Semaphore>,
    process: Arc<ProcessFn<I, O, E>>,
    counters: Arc<Counters>,
) where
    I: Send + 'static,
    O: Send + 'static,
    E: Send + 'static,
{
    while let Some(Submission { input, reply }) = rx.recv().await {
        // The semaphore is never closed.
        let Ok(permit) = Arc::clone(&slots).acquire_owned().await else {
            break;
        };

        counters.queued.fetch_sub(1, Ordering::SeqCst);
        counters.running.fetch_add(1, Ordering::SeqCst);

        let slot = Slot {
            counters: Arc::clone(&counters),
            _permit: permit,
        };
        let process = Arc::clone(&process);

        tokio::spawn(async move {
            let result = process(input).await;
            drop(slot);
            // The caller may have dropped its handle.
            let _ = reply.send(result);
        });
    }

    tracing::debug!("Task executor dispatcher stopped");
}

/// Resolves to the result of one submitted job.
#[must_use = "the job runs regardless, but its result is lost unless awaited"]
pub struct TaskHandle<O, E> {
    rx: oneshot::Receiver<Result<O, E>>,
}

impl<O, E> fmt::Debug for TaskHandle<O, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle").finish_non_exhaustive()
    }
}

impl<O, E: From<TaskAborted>> Future for TaskHandle<O, E> {
    type Output = Result<O, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(E::from(TaskAborted))),
            Poll::Pending => Poll::Pending,
        }
    }
}
