//! Unified error types for Spark.
//!
//! Three layers of failure are distinguished:
//!
//! - [`PlatformError`]: the chat platform refused or failed an operation.
//! - [`CommandError`]: a command body failed.
//! - [`DispatchError`]: routing, bridging or piping failed around a command.
//!
//! Only [`DispatchError::CommandNotFound`] is considered expected; everything
//! else is reported back to the channel that triggered it.

use std::time::Duration;

use thiserror::Error;

// =============================================================================
// Platform Errors
// =============================================================================

/// Errors raised by a [`Platform`](crate::platform::Platform) implementation.
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    /// Sending a message failed.
    #[error("failed to send message: {0}")]
    SendFailed(String),
}

// =============================================================================
// Command Errors
// =============================================================================

/// Errors raised from inside a command body.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The arguments could not be parsed.
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    /// Sending output failed.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// The command failed with a message.
    #[error("{0}")]
    Failed(String),

    /// Any other error type.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl CommandError {
    /// Creates a failure with the given message.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Creates an invalid-arguments error.
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArgs(msg.into())
    }
}

// =============================================================================
// Dispatch Errors
// =============================================================================

/// Errors raised while routing, bridging or piping a command.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No command is registered under this name.
    #[error("command '{0}' not found")]
    CommandNotFound(String),

    /// The command body returned an error.
    #[error("command '{command}' failed")]
    Execution {
        /// Name the command was invoked by.
        command: String,
        /// The underlying error.
        #[source]
        source: CommandError,
    },

    /// A bridged call did not complete before its deadline.
    #[error("bridged call timed out after {deadline:?}")]
    Timeout {
        /// The deadline that elapsed.
        deadline: Duration,
    },

    /// The bridged job was dropped before producing a result.
    #[error("bridged call was abandoned before completing")]
    Abandoned,

    /// The main loop is no longer accepting work.
    #[error("main loop is closed")]
    LoopClosed,

    /// Pipe expansion went past the configured bound.
    #[error("pipe expansion limit of {limit} exceeded")]
    ExpansionLimit {
        /// The configured bound.
        limit: usize,
    },
}

impl DispatchError {
    /// Wraps a command error with the name of the command that raised it.
    pub fn execution(command: impl Into<String>, source: CommandError) -> Self {
        Self::Execution {
            command: command.into(),
            source,
        }
    }

    /// Returns `true` if this error must never produce a user-visible report.
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Self::CommandNotFound(_))
    }
}

// =============================================================================
// Registry Errors
// =============================================================================

/// Errors raised while building a [`CommandRegistry`](crate::registry::CommandRegistry).
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// A name or alias is already taken.
    #[error("command name '{name}' is already registered by '{owner}'")]
    Duplicate {
        /// The conflicting name or alias.
        name: String,
        /// The command that already owns it.
        owner: String,
    },

    /// The command name is empty or contains whitespace.
    #[error("invalid command name '{0}'")]
    InvalidName(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Result type for command bodies.
pub type CommandResult<T> = Result<T, CommandError>;

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_only_not_found_is_suppressed() {
        assert!(DispatchError::CommandNotFound("x".into()).is_suppressed());
        assert!(!DispatchError::LoopClosed.is_suppressed());
        assert!(
            !DispatchError::Timeout {
                deadline: Duration::from_secs(1)
            }
            .is_suppressed()
        );
        assert!(!DispatchError::execution("x", CommandError::failed("boom")).is_suppressed());
    }

    #[test]
    fn test_execution_keeps_source() {
        let err = DispatchError::execution("upper", CommandError::failed("boom"));
        assert_eq!(err.to_string(), "command 'upper' failed");
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("boom"));
    }
}
