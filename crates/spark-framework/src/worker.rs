//! The worker thread.
//!
//! Off-loop commands are queued by the router as [`Task`]s and executed here,
//! one at a time, in arrival order. For each task the worker resolves pipe
//! chunks, then dispatches the resolved message; every step that touches the
//! platform goes through the [`DispatchBridge`] into the main loop.
//!
//! ```text
//! router ──push──▶ task queue ──▶ backlog ──▶ resolve pipes ──▶ dispatch
//!  (main loop)     (unbounded)    (≤ drain     (bridged per     (bridged)
//!                                  limit)       chunk)
//! ```
//!
//! A failing task is reported to its channel and never stops the loop.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, error, info, info_span, warn};

use spark_core::{BotState, CommandContext, DispatchResult, InboundMessage};

use crate::bridge::{DEFAULT_BRIDGE_TIMEOUT, DispatchBridge, LoopHandle};
use crate::processor::{CommandProcessor, deliver_report, format_failure};
use crate::substitution::{DEFAULT_MAX_EXPANSIONS, PipeFailurePolicy, SubstitutionEngine};

/// Default bound on how many ready tasks are pulled into the local backlog.
pub const DEFAULT_DRAIN_LIMIT: usize = 16;

// =============================================================================
// Tasks and the queue
// =============================================================================

/// One inbound message destined for the worker.
#[derive(Debug, Clone)]
pub struct Task {
    context: CommandContext,
}

impl Task {
    pub fn new(context: CommandContext) -> Self {
        Self { context }
    }

    /// The message as it was received.
    pub fn message(&self) -> &InboundMessage {
        self.context.message()
    }

    /// The context of the originating message.
    pub fn context(&self) -> &CommandContext {
        &self.context
    }
}

/// Creates the task queue shared by the router and the worker.
pub fn task_queue() -> (TaskSender, TaskReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TaskSender { tx }, TaskReceiver { rx })
}

/// Producer side of the task queue. Pushing never blocks.
#[derive(Clone)]
pub struct TaskSender {
    tx: mpsc::UnboundedSender<Task>,
}

impl TaskSender {
    /// Enqueues a task. Gives the task back if the worker is gone.
    pub fn push(&self, task: Task) -> Result<(), Task> {
        self.tx.send(task).map_err(|e| e.0)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side of the task queue, owned by the worker.
pub struct TaskReceiver {
    rx: mpsc::UnboundedReceiver<Task>,
}

// =============================================================================
// Worker
// =============================================================================

/// Tunables for the worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Deadline for each bridged call.
    pub bridge_timeout: Duration,
    /// Maximum number of tasks held in the local backlog.
    pub drain_limit: usize,
    /// Maximum pipe expansions per task.
    pub max_pipe_expansions: usize,
    /// Policy for failing inner commands.
    pub pipe_failure: PipeFailurePolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            bridge_timeout: DEFAULT_BRIDGE_TIMEOUT,
            drain_limit: DEFAULT_DRAIN_LIMIT,
            max_pipe_expansions: DEFAULT_MAX_EXPANSIONS,
            pipe_failure: PipeFailurePolicy::default(),
        }
    }
}

/// The single consumer of the task queue.
pub struct Worker {
    receiver: TaskReceiver,
    backlog: VecDeque<Task>,
    engine: SubstitutionEngine,
    processor: CommandProcessor,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(state: BotState, receiver: TaskReceiver, config: WorkerConfig) -> Self {
        let engine = SubstitutionEngine::new(state.clone())
            .policy(config.pipe_failure)
            .max_expansions(config.max_pipe_expansions);
        Self {
            receiver,
            backlog: VecDeque::new(),
            engine,
            processor: CommandProcessor::new(state),
            config,
        }
    }

    /// Starts the worker on its own named thread.
    ///
    /// The thread exits once the task queue is closed and drained. Nothing
    /// needs to join it; process shutdown does not wait for it.
    pub fn spawn(self, handle: LoopHandle) -> std::io::Result<WorkerHandle> {
        let thread = std::thread::Builder::new()
            .name("spark-worker".into())
            .spawn(move || {
                let bridge = match DispatchBridge::new(handle, self.config.bridge_timeout) {
                    Ok(bridge) => bridge,
                    Err(e) => {
                        error!(error = %e, "Failed to build dispatch bridge, worker not started");
                        return;
                    }
                };
                self.run(&bridge);
            })?;
        Ok(WorkerHandle { thread })
    }

    /// Processes tasks until the queue is closed and empty.
    pub fn run(mut self, bridge: &DispatchBridge) {
        info!(
            deadline = ?bridge.deadline(),
            drain_limit = self.config.drain_limit,
            "Worker started"
        );
        while let Some(task) = self.next_task() {
            self.process_isolated(&task, bridge);
        }
        info!("Task queue closed, worker stopped");
    }

    /// Returns the oldest pending task, blocking while there is none.
    ///
    /// Returns `None` once the queue is closed and the backlog is empty.
    pub fn next_task(&mut self) -> Option<Task> {
        if self.backlog.is_empty() {
            let task = self.receiver.rx.blocking_recv()?;
            self.backlog.push_back(task);
        }
        self.drain();
        self.backlog.pop_front()
    }

    /// Pulls already-queued tasks into the backlog without blocking.
    fn drain(&mut self) {
        while self.backlog.len() < self.config.drain_limit {
            match self.receiver.rx.try_recv() {
                Ok(task) => self.backlog.push_back(task),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
    }

    /// Number of tasks pulled off the queue but not yet processed.
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Processes one task, containing every failure inside it.
    fn process_isolated(&self, task: &Task, bridge: &DispatchBridge) {
        let span = info_span!(
            "task",
            message_id = %task.message().id,
            channel_id = %task.message().channel_id
        );
        let _enter = span.enter();
        debug!(content = %task.message().content, backlog = self.backlog.len(), "Processing task");

        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| self.process(task, bridge)));
        match outcome {
            Ok(Ok(())) => debug!("Task complete"),
            Ok(Err(e)) if e.is_suppressed() => debug!(error = %e, "Task suppressed"),
            Ok(Err(e)) => {
                warn!(error = %e, "Task failed");
                let ctx = task.context().clone();
                let report = format_failure(&e);
                let delivered = bridge.call(async move {
                    deliver_report(&ctx, report).await;
                    Ok(())
                });
                if let Err(e) = delivered {
                    error!(error = %e, "Could not schedule failure report");
                }
            }
            Err(panic) => {
                error!(panic = %panic_message(panic.as_ref()), "Task panicked");
            }
        }
    }

    /// Resolves pipes in the task's message, then dispatches the result.
    pub fn process(&self, task: &Task, bridge: &DispatchBridge) -> DispatchResult<()> {
        let resolved = self.engine.resolve(task.context(), bridge)?;
        let ctx = task.context().with_content(resolved);
        let processor = self.processor.clone();
        bridge.call(async move { processor.process(ctx).await })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

/// Handle to the running worker thread.
pub struct WorkerHandle {
    thread: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the worker thread to exit.
    pub fn join(self) -> std::thread::Result<()> {
        self.thread.join()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use spark_core::{CommandRegistry, OutputSink, PlatformResult, Reply};

    struct NullSink;

    #[async_trait::async_trait]
    impl OutputSink for NullSink {
        async fn send(&self, _reply: Reply) -> PlatformResult<()> {
            Ok(())
        }
    }

    fn state() -> BotState {
        BotState::new("!", Arc::new(CommandRegistry::new()))
    }

    fn task(id: &str) -> Task {
        let msg = InboundMessage::new(id, "u", "g", "c", format!("!cmd {id}"));
        Task::new(CommandContext::new(msg, Arc::new(NullSink), state()))
    }

    fn worker(drain_limit: usize) -> (TaskSender, Worker) {
        let (tx, rx) = task_queue();
        let config = WorkerConfig {
            drain_limit,
            ..Default::default()
        };
        (tx, Worker::new(state(), rx, config))
    }

    #[test]
    fn test_next_task_is_fifo() {
        let (tx, mut worker) = worker(4);
        for id in ["a", "b", "c", "d", "e", "f"] {
            tx.push(task(id)).unwrap();
        }
        drop(tx);

        let order: Vec<String> = std::iter::from_fn(|| worker.next_task())
            .map(|t| t.message().id.clone())
            .collect();
        assert_eq!(order, ["a", "b", "c", "d", "e", "f"]);
    }

    #[test]
    fn test_drain_is_bounded() {
        let (tx, mut worker) = worker(2);
        for id in ["a", "b", "c", "d"] {
            tx.push(task(id)).unwrap();
        }

        let first = worker.next_task().unwrap();
        assert_eq!(first.message().id, "a");
        // "a" was popped from a backlog of at most two; "b" is waiting.
        assert_eq!(worker.backlog_len(), 1);
    }

    #[test]
    fn test_closed_empty_queue_ends_worker() {
        let (tx, mut worker) = worker(4);
        drop(tx);
        assert!(worker.next_task().is_none());
    }

    #[test]
    fn test_push_after_worker_gone_returns_task() {
        let (tx, worker) = worker(4);
        drop(worker);
        assert!(tx.is_closed());
        let rejected = tx.push(task("late")).unwrap_err();
        assert_eq!(rejected.message().id, "late");
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
    }
}
