//! Inbound message filtering.

use std::collections::HashSet;

use spark_core::InboundMessage;

/// Decides which inbound messages the bot listens to at all.
///
/// A message passes when all of the following hold:
/// - it was not written by the bot itself, unless `allow_self` is set
/// - it was posted in a guild, and in the configured one if `server_id` is set
/// - its channel is not banned
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    server_id: Option<String>,
    banned_channels: HashSet<String>,
    allow_self: bool,
}

impl MessageFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept messages from this guild.
    pub fn server_id(mut self, id: impl Into<String>) -> Self {
        self.server_id = Some(id.into());
        self
    }

    /// Ignore messages posted in these channels.
    pub fn ban_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.banned_channels
            .extend(channels.into_iter().map(Into::into));
        self
    }

    /// Accept the bot's own messages.
    pub fn allow_self(mut self, allow: bool) -> Self {
        self.allow_self = allow;
        self
    }

    /// Returns `true` if `message` should be processed.
    pub fn accepts(&self, message: &InboundMessage, self_id: &str) -> bool {
        if !self.allow_self && message.author_id == self_id {
            return false;
        }
        let Some(guild_id) = message.guild_id.as_deref() else {
            return false;
        };
        if self.server_id.as_deref().is_some_and(|id| id != guild_id) {
            return false;
        }
        !self.banned_channels.contains(&message.channel_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(author: &str, guild: Option<&str>, channel: &str) -> InboundMessage {
        InboundMessage {
            id: "m".into(),
            author_id: author.into(),
            channel_id: channel.into(),
            guild_id: guild.map(Into::into),
            content: "!ping".into(),
        }
    }

    #[test]
    fn test_rejects_own_messages_unless_allowed() {
        let filter = MessageFilter::new();
        assert!(!filter.accepts(&msg("bot", Some("g"), "c"), "bot"));
        assert!(filter.accepts(&msg("user", Some("g"), "c"), "bot"));

        let filter = MessageFilter::new().allow_self(true);
        assert!(filter.accepts(&msg("bot", Some("g"), "c"), "bot"));
    }

    #[test]
    fn test_requires_guild() {
        let filter = MessageFilter::new();
        assert!(!filter.accepts(&msg("user", None, "dm"), "bot"));
    }

    #[test]
    fn test_server_id() {
        let filter = MessageFilter::new().server_id("home");
        assert!(filter.accepts(&msg("user", Some("home"), "c"), "bot"));
        assert!(!filter.accepts(&msg("user", Some("away"), "c"), "bot"));
    }

    #[test]
    fn test_banned_channels() {
        let filter = MessageFilter::new().ban_channels(["spam", "logs"]);
        assert!(!filter.accepts(&msg("user", Some("g"), "spam"), "bot"));
        assert!(!filter.accepts(&msg("user", Some("g"), "logs"), "bot"));
        assert!(filter.accepts(&msg("user", Some("g"), "general"), "bot"));
    }
}
