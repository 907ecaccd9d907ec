//! The ordinary command-processing path.
//!
//! Both the router (for main-loop commands) and the worker (for the final,
//! pipe-resolved message) end up here: parse the context's content as an
//! invocation, resolve the command, invoke it. Affinity is not consulted at
//! this point; whoever calls `process` has already decided where it runs.

use std::error::Error;
use std::fmt::Write as _;

use tracing::{Instrument, debug, info_span, warn};

use spark_core::{BotState, CommandContext, DispatchError, DispatchResult, Invocation, Reply};

/// Parses, resolves and invokes commands.
#[derive(Clone)]
pub struct CommandProcessor {
    state: BotState,
}

impl CommandProcessor {
    pub fn new(state: BotState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &BotState {
        &self.state
    }

    /// Parses `content` as an invocation under the configured prefix.
    pub fn parse(&self, content: &str) -> Option<Invocation> {
        Invocation::parse(&self.state.prefix, content)
    }

    /// Runs the command named by the context's content.
    ///
    /// Content that is not an invocation at all is accepted and ignored.
    pub async fn process(&self, ctx: CommandContext) -> DispatchResult<()> {
        let Some(invocation) = self.parse(ctx.content()) else {
            debug!(message_id = %ctx.message().id, "Not a command, ignoring");
            return Ok(());
        };
        self.invoke(ctx, invocation).await
    }

    /// Resolves and invokes an already parsed invocation.
    pub async fn invoke(&self, ctx: CommandContext, invocation: Invocation) -> DispatchResult<()> {
        let Invocation { name, args } = invocation;
        let command = self.state.registry.lookup(&name)?;

        let span = info_span!(
            "command",
            command = %name,
            channel_id = %ctx.channel_id(),
            author_id = %ctx.author_id()
        );
        command
            .invoke(ctx, args)
            .instrument(span)
            .await
            .map_err(|e| DispatchError::execution(name, e))
    }
}

/// Formats an error and its source chain as a code block for the channel.
pub fn format_failure(error: &DispatchError) -> String {
    let mut body = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(body, "\ncaused by: {cause}");
        source = cause.source();
    }
    format!("```\n{body}\n```")
}

/// Sends a failure report to the context's channel.
///
/// Suppressed errors produce no report. A report that cannot be delivered is
/// logged and dropped.
pub async fn report_failure(ctx: &CommandContext, error: &DispatchError) {
    if error.is_suppressed() {
        debug!(error = %error, "Suppressed dispatch error");
        return;
    }
    deliver_report(ctx, format_failure(error)).await;
}

/// Sends an already formatted failure report to the context's channel.
pub async fn deliver_report(ctx: &CommandContext, report: String) {
    if let Err(e) = ctx.send(Reply::text(report)).await {
        warn!(
            channel_id = %ctx.channel_id(),
            error = %e,
            "Failed to deliver failure report"
        );
    }
}
