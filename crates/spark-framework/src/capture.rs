//! Capturing output sink used for piping.
//!
//! An inner, piped command runs with a [`PipeCapture`] in place of its
//! channel sink. The command cannot tell the difference: it sends as usual,
//! and only its first send counts. If that reply carries no usable text the
//! pipe yields empty text, whatever is sent afterwards.

use async_trait::async_trait;
use parking_lot::Mutex;

use spark_core::{Embed, OutputSink, PlatformResult, Reply};

/// Records the result of the first send made through it.
#[derive(Debug, Default)]
pub struct PipeCapture {
    /// `None` until the first send; then that send's text, if any.
    first: Mutex<Option<Option<String>>>,
}

impl PipeCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the captured text, leaving the capture empty but latched.
    pub fn take(&self) -> Option<String> {
        self.first.lock().as_mut().and_then(Option::take)
    }

    /// Returns `true` once anything has been sent, capturable or not.
    pub fn is_latched(&self) -> bool {
        self.first.lock().is_some()
    }
}

/// Extracts the text a reply contributes to a pipe.
///
/// An embed takes precedence over plain content; within an embed the footer
/// wins over the description, which wins over the title. Empty fields are
/// skipped.
pub fn capture_text(reply: &Reply) -> Option<String> {
    match &reply.embed {
        Some(embed) => embed_text(embed),
        None => reply.content.clone(),
    }
}

fn embed_text(embed: &Embed) -> Option<String> {
    [&embed.footer, &embed.description, &embed.title]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .cloned()
}

#[async_trait]
impl OutputSink for PipeCapture {
    async fn send(&self, reply: Reply) -> PlatformResult<()> {
        let mut first = self.first.lock();
        if first.is_none() {
            *first = Some(capture_text(&reply));
        }
        Ok(())
    }
}
