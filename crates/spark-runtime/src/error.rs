//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use spark_core::RegistryError;

/// Errors that can occur while setting up or running the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A command could not be registered.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The worker thread could not be started.
    #[error("Failed to start worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
