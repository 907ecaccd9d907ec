//! # Spark Framework
//!
//! The dispatch engine: everything between "a message arrived" and "a command
//! ran", including piping.
//!
//! This layer provides:
//! - [`MessageRouter`]: filters inbound messages and sends each command to
//!   the main loop or the worker, depending on its affinity
//! - [`Worker`]: a dedicated thread consuming the task queue in FIFO order
//! - [`SubstitutionEngine`]: resolves `$(<prefix>cmd args)` pipe chunks
//! - [`DispatchBridge`]: blocking, deadline-bounded calls from the worker into
//!   the main loop
//! - [`MainLoop`]: the async event loop that runs routed messages and
//!   bridged jobs
//! - [`HelpCommand`]: the built-in command listing
//!
//! Wiring these together from configuration is the job of `spark-runtime`.

pub mod bridge;
pub mod capture;
pub mod filter;
pub mod help;
pub mod main_loop;
pub mod processor;
pub mod router;
pub mod substitution;
pub mod worker;

pub use bridge::{
    DEFAULT_BRIDGE_TIMEOUT, DispatchBridge, LoopHandle, LoopJob, LoopJobs, loop_channel,
};
pub use capture::{PipeCapture, capture_text};
pub use filter::MessageFilter;
pub use help::{HelpCommand, render_help};
pub use main_loop::MainLoop;
pub use processor::{CommandProcessor, deliver_report, format_failure, report_failure};
pub use router::{MessageRouter, RouteOutcome};
pub use substitution::{DEFAULT_MAX_EXPANSIONS, PipeFailurePolicy, SubstitutionEngine};
pub use worker::{
    DEFAULT_DRAIN_LIMIT, Task, TaskReceiver, TaskSender, Worker, WorkerConfig, WorkerHandle,
    task_queue,
};
