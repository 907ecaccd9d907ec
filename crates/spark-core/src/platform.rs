//! The chat platform client seen from the core.
//!
//! The client owns the network connection; Spark only needs to identify the
//! bot and to send replies into a channel. Implementations are only ever
//! called from main-loop tasks.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PlatformResult;
use crate::message::Reply;

/// A connected chat platform client.
#[async_trait]
pub trait Platform: Send + Sync + 'static {
    /// Short platform name, used in logs.
    fn name(&self) -> &str;

    /// The bot's own user id on this platform.
    fn self_id(&self) -> &str;

    /// Sends `reply` into `channel_id`.
    ///
    /// Returns the id of the created message.
    async fn send(&self, channel_id: &str, reply: &Reply) -> PlatformResult<String>;
}

/// A shared platform client.
pub type BoxedPlatform = Arc<dyn Platform>;
