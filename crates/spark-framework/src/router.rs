//! Routing of inbound messages.
//!
//! The router runs on the main loop and decides, for each message, whether it
//! is dropped, executed right here, or handed to the worker.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use spark_core::{
    Affinity, BotState, BoxedPlatform, ChannelSink, CommandContext, InboundMessage, Invocation,
};

use crate::filter::MessageFilter;
use crate::processor::{CommandProcessor, report_failure};
use crate::worker::{Task, TaskSender};

/// What the router did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Rejected by the message filter.
    Filtered,
    /// Not an invocation of a registered command.
    Ignored,
    /// A main-loop command ran to completion.
    Executed,
    /// A main-loop command ran and failed; the failure was reported.
    Failed,
    /// Handed to the worker.
    Enqueued,
    /// The worker is gone; the message was discarded.
    Dropped,
}

/// Classifies inbound messages and sends them where they run.
pub struct MessageRouter {
    filter: MessageFilter,
    processor: CommandProcessor,
    platform: BoxedPlatform,
    tasks: TaskSender,
}

impl MessageRouter {
    pub fn new(
        state: BotState,
        filter: MessageFilter,
        platform: BoxedPlatform,
        tasks: TaskSender,
    ) -> Self {
        Self {
            filter,
            processor: CommandProcessor::new(state),
            platform,
            tasks,
        }
    }

    /// Routes one message.
    ///
    /// Main-loop commands are awaited here, so the caller should run this in
    /// its own task if it must not hold up the next message.
    pub async fn route(&self, message: InboundMessage) -> RouteOutcome {
        if !self.filter.accepts(&message, self.platform.self_id()) {
            trace!(message_id = %message.id, "Message filtered");
            return RouteOutcome::Filtered;
        }

        let Some(invocation) = self.processor.parse(&message.content) else {
            return RouteOutcome::Ignored;
        };
        let Some(command) = self.processor.state().registry.get(&invocation.name) else {
            debug!(command = %invocation.name, "Unknown command, ignoring");
            return RouteOutcome::Ignored;
        };

        let ctx = self.context(message);
        match command.affinity() {
            Affinity::MainLoop => self.execute(ctx, invocation).await,
            Affinity::Worker => self.enqueue(ctx),
        }
    }

    fn context(&self, message: InboundMessage) -> CommandContext {
        let sink = Arc::new(ChannelSink::new(
            Arc::clone(&self.platform),
            message.channel_id.clone(),
        ));
        CommandContext::new(message, sink, self.processor.state().clone())
    }

    async fn execute(&self, ctx: CommandContext, invocation: Invocation) -> RouteOutcome {
        debug!(command = %invocation.name, "Running on main loop");
        match self.processor.invoke(ctx.clone(), invocation).await {
            Ok(()) => RouteOutcome::Executed,
            Err(e) => {
                warn!(error = %e, "Main-loop command failed");
                report_failure(&ctx, &e).await;
                RouteOutcome::Failed
            }
        }
    }

    fn enqueue(&self, ctx: CommandContext) -> RouteOutcome {
        let message_id = ctx.message().id.clone();
        match self.tasks.push(Task::new(ctx)) {
            Ok(()) => {
                debug!(message_id = %message_id, "Enqueued for worker");
                RouteOutcome::Enqueued
            }
            Err(_) => {
                warn!(message_id = %message_id, "Worker is gone, dropping message");
                RouteOutcome::Dropped
            }
        }
    }
}
