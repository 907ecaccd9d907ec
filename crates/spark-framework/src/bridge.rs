//! Dispatch bridge between the worker thread and the main loop.
//!
//! The main loop is the only place that may touch platform state. Code on
//! the worker thread therefore never runs a command itself: it packages the
//! work as a future, submits it to the main loop as a [`LoopJob`], and blocks
//! until the job reports back or the deadline elapses.
//!
//! ```text
//!  worker thread                         main loop
//!  ─────────────                         ─────────
//!  DispatchBridge::call(work)
//!    ├─ LoopHandle::submit(job) ───────▶ LoopJobs::next()
//!    │                                     └─ tokio::spawn(job)
//!    │                                          └─ work.await
//!    └─ block on reply (≤ deadline) ◀──────────── oneshot reply
//! ```
//!
//! The wait runs on a private current-thread runtime owned by the bridge, so
//! the deadline is enforced even when the main loop is not making progress.
//! A timed-out job is aborted at its next suspension point.

use std::future::Future;
use std::time::Duration;

use futures::future::{BoxFuture, abortable};
use tokio::runtime::Runtime;
use tokio::sync::{mpsc, oneshot};
use tracing::{trace, warn};

use spark_core::{DispatchError, DispatchResult};

/// Default upper bound on a single bridged call.
pub const DEFAULT_BRIDGE_TIMEOUT: Duration = Duration::from_secs(180);

/// A unit of work scheduled onto the main loop.
pub type LoopJob = BoxFuture<'static, ()>;

/// Creates the job channel connecting bridges to the main loop.
pub fn loop_channel() -> (LoopHandle, LoopJobs) {
    let (tx, rx) = mpsc::unbounded_channel();
    (LoopHandle { tx }, LoopJobs { rx })
}

/// Sending half of the job channel. Cheap to clone.
#[derive(Clone)]
pub struct LoopHandle {
    tx: mpsc::UnboundedSender<LoopJob>,
}

impl LoopHandle {
    /// Submits a job without waiting for it.
    pub fn submit(&self, job: LoopJob) -> DispatchResult<()> {
        self.tx.send(job).map_err(|_| DispatchError::LoopClosed)
    }

    /// Returns `true` once the main loop has stopped receiving jobs.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half of the job channel, owned by the main loop.
pub struct LoopJobs {
    rx: mpsc::UnboundedReceiver<LoopJob>,
}

impl LoopJobs {
    /// Waits for the next job. Returns `None` once every [`LoopHandle`] is gone.
    pub async fn next(&mut self) -> Option<LoopJob> {
        self.rx.recv().await
    }
}

/// Blocking, deadline-bounded calls into the main loop.
///
/// Owns a small runtime used only for waiting; create and drop it on a plain
/// thread, never inside an async context.
pub struct DispatchBridge {
    handle: LoopHandle,
    deadline: Duration,
    waiter: Runtime,
}

impl DispatchBridge {
    /// Creates a bridge submitting to `handle` with the given per-call deadline.
    pub fn new(handle: LoopHandle, deadline: Duration) -> std::io::Result<Self> {
        let waiter = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .thread_name("spark-bridge")
            .build()?;
        Ok(Self {
            handle,
            deadline,
            waiter,
        })
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Runs `work` on the main loop and blocks until it finishes.
    ///
    /// The result of `work` is returned unchanged, errors included. On top of
    /// that the call itself can fail with:
    ///
    /// - [`DispatchError::Timeout`] if the deadline elapses (the job is aborted),
    /// - [`DispatchError::Abandoned`] if the job was dropped without replying,
    /// - [`DispatchError::LoopClosed`] if the main loop no longer accepts jobs.
    ///
    /// # Panics
    ///
    /// Panics if called from within an async execution context.
    pub fn call<T, F>(&self, work: F) -> DispatchResult<T>
    where
        F: Future<Output = DispatchResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let (job, abort) = abortable(async move {
            let _ = reply_tx.send(work.await);
        });

        self.handle.submit(Box::pin(async move {
            let _ = job.await;
        }))?;
        trace!(deadline = ?self.deadline, "Submitted bridged call");

        let waited = self
            .waiter
            .block_on(async { tokio::time::timeout(self.deadline, reply_rx).await });

        match waited {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(DispatchError::Abandoned),
            Err(_) => {
                abort.abort();
                warn!(deadline = ?self.deadline, "Bridged call timed out, aborting job");
                Err(DispatchError::Timeout {
                    deadline: self.deadline,
                })
            }
        }
    }
}

impl std::fmt::Debug for DispatchBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchBridge")
            .field("deadline", &self.deadline)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use spark_core::CommandError;

    /// Serves jobs the way the main loop does.
    fn serve(mut jobs: LoopJobs) {
        tokio::spawn(async move {
            while let Some(job) = jobs.next().await {
                tokio::spawn(job);
            }
        });
    }

    /// Runs `f` on a plain OS thread and returns its result asynchronously.
    fn on_thread<T, F>(f: F) -> oneshot::Receiver<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        std::thread::spawn(move || {
            let _ = tx.send(f());
        });
        rx
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_call_returns_value() {
        let (handle, jobs) = loop_channel();
        serve(jobs);

        let result = on_thread(move || {
            let bridge = DispatchBridge::new(handle, Duration::from_secs(5)).unwrap();
            bridge.call(async { Ok::<_, DispatchError>(42) })
        })
        .await
        .unwrap();

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_call_runs_on_main_loop_thread() {
        let (handle, jobs) = loop_channel();
        serve(jobs);
        let loop_thread = std::thread::current().id();

        let ran_on = on_thread(move || {
            let bridge = DispatchBridge::new(handle, Duration::from_secs(5)).unwrap();
            bridge.call(async { Ok(std::thread::current().id()) })
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(ran_on, loop_thread);
    }

    #[tokio::test]
    async fn test_call_preserves_errors() {
        let (handle, jobs) = loop_channel();
        serve(jobs);

        let result = on_thread(move || {
            let bridge = DispatchBridge::new(handle, Duration::from_secs(5)).unwrap();
            bridge.call(async {
                Err::<(), _>(DispatchError::execution("boom", CommandError::failed("bad")))
            })
        })
        .await
        .unwrap();

        assert!(matches!(
            result,
            Err(DispatchError::Execution { ref command, .. }) if command == "boom"
        ));
    }

    #[tokio::test]
    async fn test_call_times_out_and_aborts_job() {
        let (handle, jobs) = loop_channel();
        serve(jobs);
        let dropped = Arc::new(AtomicBool::new(false));
        let flag = DropFlag(Arc::clone(&dropped));

        let result = on_thread(move || {
            let bridge = DispatchBridge::new(handle, Duration::from_millis(50)).unwrap();
            bridge.call(async move {
                let _flag = flag;
                std::future::pending::<()>().await;
                Ok(())
            })
        })
        .await
        .unwrap();

        assert!(matches!(result, Err(DispatchError::Timeout { deadline }) if deadline == Duration::from_millis(50)));

        // The aborted job is dropped the next time the main loop polls it.
        for _ in 0..50 {
            if dropped.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_panicking_job_is_abandoned() {
        let (handle, jobs) = loop_channel();
        serve(jobs);

        let result = on_thread(move || {
            let bridge = DispatchBridge::new(handle, Duration::from_secs(5)).unwrap();
            bridge.call::<(), _>(async { panic!("command exploded") })
        })
        .await
        .unwrap();

        assert!(matches!(result, Err(DispatchError::Abandoned)));
    }

    #[tokio::test]
    async fn test_closed_loop_is_reported() {
        let (handle, jobs) = loop_channel();
        drop(jobs);
        assert!(handle.is_closed());

        let result = on_thread(move || {
            let bridge = DispatchBridge::new(handle, Duration::from_secs(5)).unwrap();
            bridge.call(async { Ok(()) })
        })
        .await
        .unwrap();

        assert!(matches!(result, Err(DispatchError::LoopClosed)));
    }
}
