//! Bounded worker pool for threaded handler invocations.
//!
//! A fixed number of worker tasks drain one bounded queue. Submission never
//! waits: when the queue is full the job is handed back to the caller, which
//! runs it inline instead. Dispatch stays responsive and no invocation is
//! dropped.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::{Mutex, mpsc};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace};

use crate::handler::BoxFuture;
use crate::settings::DispatchSettings;

/// A unit of work: one handler invocation, wrapped with its error handling.
pub type Job = BoxFuture<'static, ()>;

/// Why a job was handed back instead of queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Every worker is busy and the backlog is full.
    Full,
    /// The pool has been shut down.
    Closed,
}

/// A job the pool refused, returned so the caller can run it.
pub struct Rejected {
    pub job: Job,
    pub reason: RejectReason,
}

impl fmt::Debug for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

/// Counters for pool activity.
#[derive(Debug, Default)]
pub struct WorkerPoolMetrics {
    submitted: AtomicU64,
    completed: AtomicU64,
    rejected: AtomicU64,
}

impl WorkerPoolMetrics {
    fn record_submit(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    fn record_completion(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_reject(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Jobs accepted by the queue.
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Jobs a worker finished running.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Jobs handed back to the caller.
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

/// A fixed-size pool of worker tasks behind a bounded queue.
pub struct WorkerPool {
    tx: RwLock<Option<mpsc::Sender<Job>>>,
    tracker: TaskTracker,
    metrics: Arc<WorkerPoolMetrics>,
    workers: usize,
}

impl WorkerPool {
    /// Spawns the workers. Must be called from within a Tokio runtime.
    ///
    /// `settings.workers` and `settings.backlog` are clamped to at least 1.
    pub fn new(settings: DispatchSettings) -> Self {
        let workers = settings.workers.max(1);
        let (tx, rx) = mpsc::channel::<Job>(settings.backlog.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let metrics = Arc::new(WorkerPoolMetrics::default());
        let tracker = TaskTracker::new();

        for id in 0..workers {
            let rx = Arc::clone(&rx);
            let metrics = Arc::clone(&metrics);
            tracker.spawn(async move {
                trace!(worker = id, "Worker started");
                loop {
                    let job = { rx.lock().await.recv().await };
                    let Some(job) = job else { break };
                    job.await;
                    metrics.record_completion();
                }
                trace!(worker = id, "Worker stopped");
            });
        }
        tracker.close();

        info!(workers, backlog = settings.backlog.max(1), "Worker pool started");
        Self {
            tx: RwLock::new(Some(tx)),
            tracker,
            metrics,
            workers,
        }
    }

    /// Queues `job` without waiting.
    ///
    /// On [`RejectReason::Full`] or [`RejectReason::Closed`] the job is
    /// returned untouched.
    pub fn try_submit(&self, job: Job) -> Result<(), Rejected> {
        let guard = self.tx.read();
        let Some(tx) = guard.as_ref() else {
            self.metrics.record_reject();
            return Err(Rejected {
                job,
                reason: RejectReason::Closed,
            });
        };
        match tx.try_send(job) {
            Ok(()) => {
                self.metrics.record_submit();
                Ok(())
            }
            Err(err) => {
                self.metrics.record_reject();
                let reason = match err {
                    mpsc::error::TrySendError::Full(_) => RejectReason::Full,
                    mpsc::error::TrySendError::Closed(_) => RejectReason::Closed,
                };
                Err(Rejected {
                    job: err.into_inner(),
                    reason,
                })
            }
        }
    }

    /// Jobs waiting for a worker.
    pub fn queue_depth(&self) -> usize {
        self.tx
            .read()
            .as_ref()
            .map_or(0, |tx| tx.max_capacity() - tx.capacity())
    }

    /// Number of worker tasks.
    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn metrics(&self) -> &Arc<WorkerPoolMetrics> {
        &self.metrics
    }

    /// Stops accepting jobs, lets the workers drain the queue, and waits
    /// for them to exit.
    pub async fn shutdown(&self) {
        let Some(tx) = self.tx.write().take() else {
            return;
        };
        debug!(queued = tx.max_capacity() - tx.capacity(), "Draining worker pool");
        drop(tx);
        self.tracker.wait().await;
        info!(
            completed = self.metrics.completed(),
            rejected = self.metrics.rejected(),
            "Worker pool stopped"
        );
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use tokio::sync::{Notify, oneshot};

    use super::*;

    fn settings(workers: usize, backlog: usize) -> DispatchSettings {
        DispatchSettings { workers, backlog }
    }

    #[tokio::test]
    async fn test_jobs_run_on_workers() {
        let pool = WorkerPool::new(settings(2, 8));
        let (tx, rx) = oneshot::channel();
        pool.try_submit(Box::pin(async move {
            let _ = tx.send(42);
        }))
        .unwrap();
        assert_eq!(rx.await.unwrap(), 42);
        pool.shutdown().await;
        assert_eq!(pool.metrics().completed(), 1);
    }

    #[tokio::test]
    async fn test_full_queue_hands_job_back() {
        let pool = WorkerPool::new(settings(1, 1));
        let gate = Arc::new(Notify::new());
        let (started_tx, started_rx) = oneshot::channel();

        // Occupy the only worker.
        let g = Arc::clone(&gate);
        pool.try_submit(Box::pin(async move {
            let _ = started_tx.send(());
            g.notified().await;
        }))
        .unwrap();
        started_rx.await.unwrap();

        // Fill the backlog.
        pool.try_submit(Box::pin(async {})).unwrap();

        let rejected = pool.try_submit(Box::pin(async {})).unwrap_err();
        assert_eq!(rejected.reason, RejectReason::Full);
        rejected.job.await;
        assert_eq!(pool.metrics().rejected(), 1);

        gate.notify_one();
        pool.shutdown().await;
        assert_eq!(pool.metrics().completed(), 2);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_is_closed() {
        let pool = WorkerPool::new(settings(1, 1));
        pool.shutdown().await;
        let rejected = pool.try_submit(Box::pin(async {})).unwrap_err();
        assert_eq!(rejected.reason, RejectReason::Closed);
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue() {
        let pool = WorkerPool::new(settings(1, 16));
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            pool.try_submit(Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        }
        pool.shutdown().await;
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }
}
