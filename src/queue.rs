//! Deferred task queue for background revalidation.
//!
//! Jobs are pushed onto an unbounded channel and never run on the caller's
//! stack. A worker task drains the channel and spawns each job, waiting for it
//! to start before spawning the next, so jobs start in the order they were
//! deferred but may then run concurrently.

use futures::FutureExt as _;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};

use crate::error::CacheError;

type Job = BoxFuture<'static, ()>;

/// FIFO queue of background jobs with a way to wait for them to drain.
///
/// The worker lives on the Tokio runtime that first needed it. If that
/// runtime shuts down, the next [`defer`](Self::defer) starts a new worker on
/// the caller's runtime, so a queue can outlive the runtime that created it.
pub struct DeferredQueue {
    /// Sender for the running worker, `None` until the first `defer`.
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    pending: Arc<watch::Sender<usize>>,
}

/// Decrements the pending count when a job finishes, panics, or is dropped.
struct PendingGuard(Arc<watch::Sender<usize>>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl Default for DeferredQueue {
    fn default() -> Self {
        let (pending, _) = watch::channel(0);
        DeferredQueue {
            sender: Mutex::new(None),
            pending: Arc::new(pending),
        }
    }
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `job` to run after the current task yields. Never blocks and
    /// never awaits the job.
    ///
    /// Fails when called outside a Tokio runtime or while the runtime is
    /// shutting down; the job is dropped without running. Otherwise the job
    /// is responsible for handling its own errors.
    pub fn defer<Fut>(&self, job: Fut) -> Result<(), CacheError>
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|e| {
            CacheError::operation("queue", "", format!("No runtime to defer onto: {}", e))
        })?;

        self.pending.send_modify(|n| *n += 1);
        let guard = PendingGuard(Arc::clone(&self.pending));
        let job = async move {
            let _guard = guard;
            job.await;
        }
        .boxed();

        let mut sender = self.lock_sender();
        let job = match sender.as_ref() {
            Some(tx) => match tx.send(job) {
                Ok(()) => return Ok(()),
                Err(mpsc::error::SendError(job)) => job,
            },
            None => job,
        };

        // No worker yet, or it went away with its runtime.
        let tx = spawn_worker(&runtime);
        let sent = tx.send(job).map_err(|_| {
            CacheError::operation("queue", "", "Deferred queue worker is not running")
        });
        *sender = Some(tx);
        sent
    }

    /// Number of deferred jobs that have not finished yet.
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Wait until every job deferred so far (and any they defer) has finished.
    pub async fn settled(&self) {
        let mut rx = self.pending.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    fn lock_sender(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<Job>>> {
        match self.sender.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn spawn_worker(runtime: &Handle) -> mpsc::UnboundedSender<Job> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Job>();

    runtime.spawn(async move {
        while let Some(job) = rx.recv().await {
            let (started_tx, started_rx) = oneshot::channel();
            tokio::spawn(async move {
                let _ = started_tx.send(());
                job.await;
            });
            // Tokio may poll the newest task first; hold the next job back
            // until this one has begun.
            let _ = started_rx.await;
        }
    });

    tx
}
