//! # Spark
//!
//! A chat bot command framework that keeps its event loop responsive.
//!
//! ## Overview
//!
//! The platform connection lives on a single-threaded main loop. Commands
//! that are cheap run right there; everything else is queued for a dedicated
//! worker thread, which calls back into the main loop whenever it needs the
//! platform. Commands can be piped into one another inline:
//!
//! ```text
//! !echo $(!upper hello)      →      !echo HELLO
//! ```
//!
//! ## Architecture
//!
//! ```text
//!            ┌──────────────── main loop (current-thread tokio) ───────────────┐
//! inbound ──▶│ MessageRouter ──▶ main-loop command (inline)                    │
//!            │      │                                                          │
//!            │      └─ enqueue ─┐                  bridged jobs ◀──┐           │
//!            └──────────────────┼──────────────────────────────────┼───────────┘
//!                               ▼                                  │
//!            ┌──────────── worker thread ──────────────────────────┼───────────┐
//!            │ task queue ──▶ SubstitutionEngine ──▶ dispatch ─────┘           │
//!            └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **Core** (`spark-core`): messages, the platform trait, commands, the registry
//! - **Framework** (`spark-framework`): router, worker, bridge, pipes, main loop
//! - **Runtime** (`spark-runtime`): configuration, logging, process wiring
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use spark::prelude::*;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = SparkRuntime::new();
//!     runtime.register_command(
//!         command_fn("upper", |ctx: CommandContext, args: Args| async move {
//!             ctx.say(args.raw().to_uppercase()).await
//!         })
//!         .description("~ Shout the given text")
//!         .usage(" <text>"),
//!     )?;
//!
//!     let (platform, inbound) = my_platform::connect().await?;
//!     runtime.run(platform, inbound).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `command`: typed command arguments via clap (default)
//! - `toml-config`: `spark.toml` configuration files (default)
//! - `yaml-config`: `spark.yaml` configuration files
//! - `json-log`: JSON log output

pub use spark_core as core;
pub use spark_framework as framework;
pub use spark_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use spark::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use spark_runtime::{SparkConfig, SparkRuntime};

    // Commands
    pub use spark_core::prelude::*;
    pub use spark_core::{BoxedPlatform, InboundMessage, Platform, PlatformError, PlatformResult};

    // Pipe behaviour
    pub use spark_framework::PipeFailurePolicy;
}
