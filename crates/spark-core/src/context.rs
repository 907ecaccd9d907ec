//! Execution context handed to commands.
//!
//! A [`CommandContext`] binds one inbound message to one [`OutputSink`].
//! Everything a command can read (author, channel, guild, content, prefix,
//! registry) comes from the message and the bot-wide state; the only thing
//! a command can *do* through the context is send, and that goes to the sink.
//!
//! Swapping the sink is how piping works: the same context with a capturing
//! sink behaves identically for every read, and records instead of
//! transmitting.
//!
//! ```rust,ignore
//! async fn upper(ctx: CommandContext, args: Args) -> CommandResult<()> {
//!     ctx.say(args.raw().to_uppercase()).await
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{CommandResult, PlatformResult};
use crate::message::{InboundMessage, Reply};
use crate::platform::BoxedPlatform;
use crate::registry::CommandRegistry;

/// Where a command's output goes.
#[async_trait]
pub trait OutputSink: Send + Sync + 'static {
    /// Delivers one reply.
    async fn send(&self, reply: Reply) -> PlatformResult<()>;
}

/// Output sink that transmits to a channel on the chat platform.
pub struct ChannelSink {
    platform: BoxedPlatform,
    channel_id: String,
}

impl ChannelSink {
    pub fn new(platform: BoxedPlatform, channel_id: impl Into<String>) -> Self {
        Self {
            platform,
            channel_id: channel_id.into(),
        }
    }
}

#[async_trait]
impl OutputSink for ChannelSink {
    async fn send(&self, reply: Reply) -> PlatformResult<()> {
        self.platform.send(&self.channel_id, &reply).await?;
        Ok(())
    }
}

/// Bot-wide, read-only state shared by every context.
///
/// Built once at startup and never mutated afterwards.
#[derive(Clone)]
pub struct BotState {
    /// Command prefix.
    pub prefix: Arc<str>,
    /// All registered commands.
    pub registry: Arc<CommandRegistry>,
}

impl BotState {
    pub fn new(prefix: impl Into<Arc<str>>, registry: Arc<CommandRegistry>) -> Self {
        Self {
            prefix: prefix.into(),
            registry,
        }
    }
}

/// The handle a command uses to inspect its invocation and produce output.
#[derive(Clone)]
pub struct CommandContext {
    message: Arc<InboundMessage>,
    sink: Arc<dyn OutputSink>,
    state: BotState,
}

impl CommandContext {
    /// Creates a context over `message` writing to `sink`.
    pub fn new(message: InboundMessage, sink: Arc<dyn OutputSink>, state: BotState) -> Self {
        Self {
            message: Arc::new(message),
            sink,
            state,
        }
    }

    /// Returns a context for the same sender and channel with different content.
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            message: Arc::new(self.message.with_content(content)),
            sink: Arc::clone(&self.sink),
            state: self.state.clone(),
        }
    }

    /// Returns a context identical to this one except for its output sink.
    pub fn with_sink(&self, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            message: Arc::clone(&self.message),
            sink,
            state: self.state.clone(),
        }
    }

    /// The message that triggered this invocation.
    pub fn message(&self) -> &InboundMessage {
        &self.message
    }

    pub fn author_id(&self) -> &str {
        &self.message.author_id
    }

    pub fn channel_id(&self) -> &str {
        &self.message.channel_id
    }

    pub fn guild_id(&self) -> Option<&str> {
        self.message.guild_id.as_deref()
    }

    /// The raw message text, including prefix and command name.
    pub fn content(&self) -> &str {
        &self.message.content
    }

    /// The configured command prefix.
    pub fn prefix(&self) -> &str {
        &self.state.prefix
    }

    /// The command registry.
    pub fn registry(&self) -> &CommandRegistry {
        &self.state.registry
    }

    /// The bot-wide state.
    pub fn state(&self) -> &BotState {
        &self.state
    }

    /// Sends a reply through this context's sink.
    pub async fn send(&self, reply: impl Into<Reply>) -> CommandResult<()> {
        self.sink.send(reply.into()).await?;
        Ok(())
    }

    /// Sends plain text.
    pub async fn say(&self, text: impl Into<String>) -> CommandResult<()> {
        self.send(Reply::text(text)).await
    }
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("message_id", &self.message.id)
            .field("channel_id", &self.message.channel_id)
            .field("author_id", &self.message.author_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct MockPlatform {
        sent: Mutex<Vec<(String, Reply)>>,
    }

    #[async_trait]
    impl Platform for MockPlatform {
        fn name(&self) -> &str {
            "mock"
        }

        fn self_id(&self) -> &str {
            "bot"
        }

        async fn send(&self, channel_id: &str, reply: &Reply) -> PlatformResult<String> {
            let mut sent = self.sent.lock();
            sent.push((channel_id.to_string(), reply.clone()));
            Ok(sent.len().to_string())
        }
    }

    fn state() -> BotState {
        BotState::new("!", Arc::new(CommandRegistry::new()))
    }

    #[tokio::test]
    async fn test_channel_sink_targets_message_channel() {
        let platform = Arc::new(MockPlatform::default());
        let msg = InboundMessage::new("m1", "u1", "g1", "c9", "!echo hi");
        let sink = Arc::new(ChannelSink::new(platform.clone(), msg.channel_id.clone()));
        let ctx = CommandContext::new(msg, sink, state());

        ctx.say("hi").await.unwrap();

        let sent = platform.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "c9");
        assert_eq!(sent[0].1, Reply::text("hi"));
    }

    #[tokio::test]
    async fn test_with_sink_forwards_reads() {
        let platform = Arc::new(MockPlatform::default());
        let msg = InboundMessage::new("m1", "u1", "g1", "c1", "!echo hi");
        let ctx = CommandContext::new(msg, Arc::new(ChannelSink::new(platform.clone(), "c1")), state());

        let other_platform = Arc::new(MockPlatform::default());
        let derived = ctx
            .with_content("!upper hi")
            .with_sink(Arc::new(ChannelSink::new(other_platform.clone(), "c1")));

        assert_eq!(derived.author_id(), ctx.author_id());
        assert_eq!(derived.channel_id(), ctx.channel_id());
        assert_eq!(derived.guild_id(), ctx.guild_id());
        assert_eq!(derived.prefix(), "!");
        assert_eq!(derived.content(), "!upper hi");
        assert_eq!(ctx.content(), "!echo hi");

        derived.say("x").await.unwrap();
        assert!(platform.sent.lock().is_empty());
        assert_eq!(other_platform.sent.lock().len(), 1);
    }
}
