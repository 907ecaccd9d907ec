//! Configuration schema definitions.
//!
//! ```toml
//! [logging]
//! level = "debug"
//! format = "pretty"
//!
//! [logging.filters]
//! spark_framework = "trace"
//!
//! [bot]
//! prefix = "!"
//! server_id = "123456789"
//! banned_channels = ["987654321"]
//!
//! [dispatch]
//! bridge_timeout_secs = 180
//! pipe_failure = "degrade"
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use spark_framework::{
    DEFAULT_BRIDGE_TIMEOUT, DEFAULT_DRAIN_LIMIT, DEFAULT_MAX_EXPANSIONS, MessageFilter,
    PipeFailurePolicy, WorkerConfig,
};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SparkConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub bot: BotConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature.
    #[cfg(feature = "json-log")]
    Json,
}

/// Where log lines are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Requires `file_path`.
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file, used when `output = "file"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread ids in each line.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line in each line.
    #[serde(default)]
    pub file_location: bool,

    /// Per-module levels, e.g. `spark_framework = "trace"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

// =============================================================================
// Bot
// =============================================================================

/// Message intake settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Command prefix.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Only listen to this guild.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,

    /// Channels whose messages are ignored.
    #[serde(default)]
    pub banned_channels: Vec<String>,

    /// Process the bot's own messages.
    #[serde(default)]
    pub allow_self: bool,

    /// Register the built-in `help` command.
    #[serde(default = "default_builtin_help")]
    pub builtin_help: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            server_id: None,
            banned_channels: Vec::new(),
            allow_self: false,
            builtin_help: default_builtin_help(),
        }
    }
}

impl BotConfig {
    /// Builds the inbound message filter.
    pub fn filter(&self) -> MessageFilter {
        let mut filter = MessageFilter::new()
            .ban_channels(self.banned_channels.iter().cloned())
            .allow_self(self.allow_self);
        if let Some(id) = &self.server_id {
            filter = filter.server_id(id.clone());
        }
        filter
    }
}

fn default_prefix() -> String {
    "!".to_string()
}

fn default_builtin_help() -> bool {
    true
}

// =============================================================================
// Dispatch
// =============================================================================

/// Worker, bridge and pipe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Deadline for a single bridged call, in seconds.
    #[serde(default = "default_bridge_timeout_secs")]
    pub bridge_timeout_secs: u64,

    /// Maximum number of tasks the worker pulls into its backlog at once.
    #[serde(default = "default_drain_limit")]
    pub drain_limit: usize,

    /// Maximum pipe expansions per message.
    #[serde(default = "default_max_pipe_expansions")]
    pub max_pipe_expansions: usize,

    /// What a failing inner command does to the outer message.
    #[serde(default)]
    pub pipe_failure: PipeFailurePolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            bridge_timeout_secs: default_bridge_timeout_secs(),
            drain_limit: default_drain_limit(),
            max_pipe_expansions: default_max_pipe_expansions(),
            pipe_failure: PipeFailurePolicy::default(),
        }
    }
}

impl DispatchConfig {
    pub fn bridge_timeout(&self) -> Duration {
        Duration::from_secs(self.bridge_timeout_secs)
    }

    /// Builds the worker settings.
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            bridge_timeout: self.bridge_timeout(),
            drain_limit: self.drain_limit,
            max_pipe_expansions: self.max_pipe_expansions,
            pipe_failure: self.pipe_failure,
        }
    }
}

fn default_bridge_timeout_secs() -> u64 {
    DEFAULT_BRIDGE_TIMEOUT.as_secs()
}

fn default_drain_limit() -> usize {
    DEFAULT_DRAIN_LIMIT
}

fn default_max_pipe_expansions() -> usize {
    DEFAULT_MAX_EXPANSIONS
}

#[cfg(test)]
mod tests {
    use super::*;
    use spark_core::InboundMessage;

    #[test]
    fn test_defaults() {
        let config = SparkConfig::default();
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.bot.prefix, "!");
        assert!(config.bot.builtin_help);
        assert!(!config.bot.allow_self);
        assert_eq!(config.dispatch.bridge_timeout(), Duration::from_secs(180));
        assert_eq!(config.dispatch.pipe_failure, PipeFailurePolicy::Degrade);
    }

    #[test]
    fn test_worker_config() {
        let dispatch = DispatchConfig {
            bridge_timeout_secs: 5,
            drain_limit: 3,
            max_pipe_expansions: 7,
            pipe_failure: PipeFailurePolicy::Abort,
        };
        let worker = dispatch.worker_config();
        assert_eq!(worker.bridge_timeout, Duration::from_secs(5));
        assert_eq!(worker.drain_limit, 3);
        assert_eq!(worker.max_pipe_expansions, 7);
        assert_eq!(worker.pipe_failure, PipeFailurePolicy::Abort);
    }

    #[test]
    fn test_bot_filter() {
        let bot = BotConfig {
            server_id: Some("home".into()),
            banned_channels: vec!["spam".into()],
            ..Default::default()
        };
        let filter = bot.filter();
        assert!(filter.accepts(&InboundMessage::new("1", "u", "home", "general", "!x"), "bot"));
        assert!(!filter.accepts(&InboundMessage::new("2", "u", "away", "general", "!x"), "bot"));
        assert!(!filter.accepts(&InboundMessage::new("3", "u", "home", "spam", "!x"), "bot"));
        assert!(!filter.accepts(&InboundMessage::new("4", "bot", "home", "general", "!x"), "bot"));
    }
}
