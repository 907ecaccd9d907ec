//! Configuration module for the Spark runtime.
//!
//! Layered loading (defaults, files, `SPARK_*` environment) and validation
//! for logging, message intake and dispatch settings.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotConfig, DispatchConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, SpanEventConfig,
    SparkConfig,
};
pub use validation::validate_config;
