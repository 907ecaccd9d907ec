//! The command abstraction.
//!
//! A command is a named async operation: given a [`CommandContext`] and
//! parsed [`Args`], it sends zero or more replies through the context, or
//! fails. Commands declare an [`Affinity`] that tells the router whether they
//! run inline on the main loop or are handed to the worker thread.
//!
//! Implement [`Command`] directly for commands that carry state, or use
//! [`command_fn`] for closures:
//!
//! ```rust,ignore
//! let upper = command_fn("upper", |ctx: CommandContext, args: Args| async move {
//!     ctx.say(args.raw().to_uppercase()).await
//! })
//! .description("~ Shout the given text");
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::args::Args;
use crate::context::CommandContext;
use crate::error::CommandResult;

/// Where a command executes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Affinity {
    /// Runs inline in the main loop's processing path.
    MainLoop,
    /// Runs through the worker thread, with pipe substitution.
    #[default]
    Worker,
}

/// A named command.
#[async_trait]
pub trait Command: Send + Sync + 'static {
    /// Primary name.
    fn name(&self) -> &str;

    /// Alternative names.
    fn aliases(&self) -> &[String] {
        &[]
    }

    /// One-line description shown by `help`.
    fn description(&self) -> &str {
        ""
    }

    /// Argument synopsis shown by `help`.
    fn usage(&self) -> &str {
        ""
    }

    fn affinity(&self) -> Affinity {
        Affinity::Worker
    }

    /// Runs the command.
    async fn invoke(&self, ctx: CommandContext, args: Args) -> CommandResult<()>;
}

/// A shared command.
pub type BoxedCommand = Arc<dyn Command>;

// =============================================================================
// Closure-backed commands
// =============================================================================

/// A [`Command`] backed by an async closure.
pub struct FnCommand<F> {
    name: String,
    aliases: Vec<String>,
    description: String,
    usage: String,
    affinity: Affinity,
    f: F,
}

/// Creates a command from an async closure.
pub fn command_fn<F, Fut>(name: impl Into<String>, f: F) -> FnCommand<F>
where
    F: Fn(CommandContext, Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CommandResult<()>> + Send + 'static,
{
    FnCommand {
        name: name.into(),
        aliases: Vec::new(),
        description: String::new(),
        usage: String::new(),
        affinity: Affinity::Worker,
        f,
    }
}

impl<F> FnCommand<F> {
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    pub fn affinity(mut self, affinity: Affinity) -> Self {
        self.affinity = affinity;
        self
    }

    /// Shorthand for `affinity(Affinity::MainLoop)`.
    pub fn main_loop(self) -> Self {
        self.affinity(Affinity::MainLoop)
    }
}

#[async_trait]
impl<F, Fut> Command for FnCommand<F>
where
    F: Fn(CommandContext, Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CommandResult<()>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn aliases(&self) -> &[String] {
        &self.aliases
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn usage(&self) -> &str {
        &self.usage
    }

    fn affinity(&self) -> Affinity {
        self.affinity
    }

    async fn invoke(&self, ctx: CommandContext, args: Args) -> CommandResult<()> {
        (self.f)(ctx, args).await
    }
}
