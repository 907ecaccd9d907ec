//! Spark Runtime - Orchestration layer for the Spark command framework.
//!
//! This crate provides:
//! - Layered configuration loading (`ConfigLoader`, `SparkConfig`)
//! - Logging configuration (`LoggingBuilder`)
//! - Runtime orchestration (`SparkRuntime`): registry, worker thread and
//!   main loop wired from configuration
//!
//! ```ignore
//! use spark_runtime::SparkRuntime;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = SparkRuntime::builder().config_file("spark.toml").build()?;
//!     runtime.register_command(my_command())?;
//!
//!     // Run until Ctrl+C or until the platform closes the inbound stream
//!     runtime.run(platform, inbound).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{
    BotConfig, ConfigError, ConfigLoader, ConfigResult, DispatchConfig, LoggingConfig,
    SparkConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{RuntimeBuilder, SparkRuntime};

pub use tracing;
pub use tracing_subscriber;

/// Logging macros for command authors, so a bot crate does not need its own
/// `tracing` dependency.
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
