//! Runtime orchestration.
//!
//! [`SparkRuntime`] turns a [`SparkConfig`] and a set of commands into a
//! running engine: it builds the registry, starts the worker thread, and
//! drives the main loop on the current task.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use spark_runtime::SparkRuntime;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     // Auto-loads spark.toml from the current directory
//!     let mut runtime = SparkRuntime::new();
//!     runtime.register_command(command_fn("echo", |ctx, args| async move {
//!         ctx.say(args.raw()).await
//!     }))?;
//!
//!     let (platform, inbound) = connect().await?;
//!     runtime.run(platform, inbound).await?;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use spark_core::{
    BotState, BoxedCommand, BoxedPlatform, Command, CommandRegistry, InboundMessage,
};
use spark_framework::{
    HelpCommand, MainLoop, MessageRouter, Worker, WorkerHandle, loop_channel, task_queue,
};

use crate::config::{ConfigLoader, ConfigResult, SparkConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// The Spark runtime.
///
/// Run it on a current-thread tokio runtime: that thread becomes the main
/// loop, and it is the only thread that ever touches the platform.
pub struct SparkRuntime {
    config: SparkConfig,
    registry: CommandRegistry,
}

impl SparkRuntime {
    /// Creates a runtime with automatic configuration loading.
    ///
    /// Searches the current directory for `spark.toml`; falls back to the
    /// defaults if loading fails.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                SparkConfig::default()
            });

        Self::from_config(&config)
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from configuration and initializes logging from it.
    pub fn from_config(config: &SparkConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            prefix = %config.bot.prefix,
            pipe_failure = ?config.dispatch.pipe_failure,
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            registry: CommandRegistry::new(),
        }
    }

    pub fn config(&self) -> &SparkConfig {
        &self.config
    }

    /// Registers a command.
    pub fn register_command<C: Command>(&mut self, command: C) -> RuntimeResult<()> {
        self.registry.register(command)?;
        Ok(())
    }

    /// Registers an already shared command.
    pub fn register_boxed(&mut self, command: BoxedCommand) -> RuntimeResult<()> {
        self.registry.register_boxed(command)?;
        Ok(())
    }

    /// Number of commands registered so far, excluding the built-in `help`.
    pub fn command_count(&self) -> usize {
        self.registry.len()
    }

    /// Runs until the inbound stream ends or a shutdown signal is received.
    pub async fn run(
        self,
        platform: BoxedPlatform,
        inbound: mpsc::Receiver<InboundMessage>,
    ) -> RuntimeResult<()> {
        info!("Spark runtime is now running. Press Ctrl+C to stop.");
        self.run_until(platform, inbound, wait_for_shutdown()).await
    }

    /// Runs until the inbound stream ends or `shutdown` completes.
    ///
    /// When the inbound stream ends, queued tasks are finished first. When
    /// `shutdown` completes, the main loop stops at once and the worker thread
    /// is left to exit on its own.
    pub async fn run_until<F>(
        self,
        platform: BoxedPlatform,
        inbound: mpsc::Receiver<InboundMessage>,
        shutdown: F,
    ) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let (main_loop, worker) = self.start(platform)?;
        let token = CancellationToken::new();

        let running = main_loop.run(inbound, token.clone());
        tokio::pin!(running);

        let interrupted = tokio::select! {
            _ = &mut running => false,
            _ = shutdown => true,
        };

        if interrupted {
            token.cancel();
            running.await;
        } else {
            info!(worker_finished = worker.is_finished(), "Inbound stream drained");
        }

        info!("Runtime stopped");
        Ok(())
    }

    /// Builds the shared state, starts the worker and wires the main loop.
    fn start(mut self, platform: BoxedPlatform) -> RuntimeResult<(MainLoop, WorkerHandle)> {
        if self.config.bot.builtin_help && !self.registry.contains("help") {
            self.registry.register(HelpCommand::new())?;
        }

        let bot = &self.config.bot;
        let state = BotState::new(bot.prefix.as_str(), Arc::new(self.registry));
        info!(
            platform = platform.name(),
            commands = state.registry.len(),
            prefix = %state.prefix,
            "Starting Spark runtime"
        );

        let (tasks, receiver) = task_queue();
        let (handle, jobs) = loop_channel();

        let worker = Worker::new(state.clone(), receiver, self.config.dispatch.worker_config())
            .spawn(handle)
            .map_err(RuntimeError::WorkerSpawn)?;

        let router = MessageRouter::new(state, bot.filter(), platform, tasks);
        Ok((MainLoop::new(router, jobs), worker))
    }
}

impl Default for SparkRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for Ctrl+C or SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => {
                        info!("Received Ctrl+C, shutting down");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            error!(error = %e, "Failed to listen for Ctrl+C, running until inbound ends");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a `SparkRuntime` with custom configuration.
///
/// ```rust,ignore
/// let runtime = SparkRuntime::builder()
///     .config_file("config/spark.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_user_config_dir(mut self) -> Self {
        self.config_loader = self.config_loader.with_user_config_dir();
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    pub fn merge(mut self, config: SparkConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    pub fn build(self) -> ConfigResult<SparkRuntime> {
        let config = self.config_loader.load()?;
        Ok(SparkRuntime::from_config(&config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
