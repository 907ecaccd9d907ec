//! # Spark Core
//!
//! Shared types for the Spark command framework: messages, the platform
//! client trait, commands and their registry, the execution context, and the
//! error types every layer uses.
//!
//! The engine that routes, queues and pipes commands lives in
//! `spark-framework`; configuration and process wiring live in
//! `spark-runtime`.

pub mod args;
pub mod command;
pub mod context;
pub mod error;
pub mod message;
pub mod platform;
pub mod registry;

pub use args::{Args, Invocation, shell_split};
pub use command::{Affinity, BoxedCommand, Command, FnCommand, command_fn};
pub use context::{BotState, ChannelSink, CommandContext, OutputSink};
pub use error::{
    CommandError, CommandResult, DispatchError, DispatchResult, PlatformError, PlatformResult,
    RegistryError,
};
pub use message::{Embed, InboundMessage, Reply};
pub use platform::{BoxedPlatform, Platform};
pub use registry::CommandRegistry;

/// Prelude for command authors.
pub mod prelude {
    pub use super::{
        Affinity, Args, Command, CommandContext, CommandError, CommandResult, Embed, Reply,
        command_fn,
    };
}
