//! Message types exchanged with the chat platform.
//!
//! [`InboundMessage`] is what the platform hands to the main loop.
//! [`Reply`] is what a command hands back through its output sink; it may
//! carry plain text, an [`Embed`], or both.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

// ============================================================================
// Inbound
// ============================================================================

/// A message received from the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Platform-specific message id.
    pub id: String,
    /// Id of the author.
    pub author_id: String,
    /// Id of the channel the message was posted in.
    pub channel_id: String,
    /// Id of the guild (server), if any. Direct messages have none.
    #[serde(default)]
    pub guild_id: Option<String>,
    /// Raw text content.
    pub content: String,
}

impl InboundMessage {
    /// Creates a guild message.
    pub fn new(
        id: impl Into<String>,
        author_id: impl Into<String>,
        guild_id: impl Into<String>,
        channel_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            author_id: author_id.into(),
            channel_id: channel_id.into(),
            guild_id: Some(guild_id.into()),
            content: content.into(),
        }
    }

    /// Returns a copy of this message with different content.
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..self.clone()
        }
    }
}

// ============================================================================
// Outbound
// ============================================================================

/// Rich content attached to a reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }
}

/// A message a command wants to send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// Plain text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Rich content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<Embed>,
}

impl Reply {
    /// A plain text reply.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            embed: None,
        }
    }

    /// A plain text reply built from several parts joined by single spaces.
    pub fn words<I>(parts: I) -> Self
    where
        I: IntoIterator,
        I::Item: Display,
    {
        let content = parts
            .into_iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        Self::text(content)
    }

    /// An embed-only reply.
    pub fn embed(embed: Embed) -> Self {
        Self {
            content: None,
            embed: Some(embed),
        }
    }

    /// Attaches an embed to this reply.
    pub fn with_embed(mut self, embed: Embed) -> Self {
        self.embed = Some(embed);
        self
    }

    /// Returns `true` if the reply carries neither text nor an embed.
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.embed.is_none()
    }
}

impl From<&str> for Reply {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<String> for Reply {
    fn from(s: String) -> Self {
        Self::text(s)
    }
}

impl From<Embed> for Reply {
    fn from(embed: Embed) -> Self {
        Self::embed(embed)
    }
}
