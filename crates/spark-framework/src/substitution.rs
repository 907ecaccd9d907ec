//! Pipe substitution.
//!
//! A message may embed other invocations as `$(<prefix><name> <args>)`.
//! Before the message is dispatched, every such chunk is executed and
//! replaced in place by the text its command produced:
//!
//! ```text
//! !echo $(!upper hi) there      →      !echo HI there
//! ```
//!
//! Chunk arguments may not contain `$`, `(` or `)`, so the leftmost match is
//! always an innermost one and nesting resolves from the inside out:
//!
//! ```text
//! !echo $(!upper $(!joke))  →  !echo $(!upper why did…)  →  !echo WHY DID…
//! ```
//!
//! The text is rescanned after every replacement, so output that itself
//! contains pipe syntax is expanded as well. The total number of expansions
//! per message is bounded.

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use spark_core::{BotState, CommandContext, DispatchError, DispatchResult};

use crate::bridge::DispatchBridge;
use crate::capture::PipeCapture;
use crate::processor::CommandProcessor;

/// Default bound on expansions per message.
pub const DEFAULT_MAX_EXPANSIONS: usize = 32;

/// What happens when an inner command fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipeFailurePolicy {
    /// Substitute empty text and keep going.
    #[default]
    Degrade,
    /// Fail the whole message.
    Abort,
}

/// Resolves pipe chunks through a [`DispatchBridge`].
#[derive(Clone)]
pub struct SubstitutionEngine {
    pattern: Regex,
    processor: CommandProcessor,
    policy: PipeFailurePolicy,
    max_expansions: usize,
}

impl SubstitutionEngine {
    /// Creates an engine for the prefix held in `state`.
    pub fn new(state: BotState) -> Self {
        let pattern = chunk_pattern(&state.prefix);
        Self {
            pattern,
            processor: CommandProcessor::new(state),
            policy: PipeFailurePolicy::default(),
            max_expansions: DEFAULT_MAX_EXPANSIONS,
        }
    }

    pub fn policy(mut self, policy: PipeFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn max_expansions(mut self, max: usize) -> Self {
        self.max_expansions = max;
        self
    }

    /// Returns the byte range of the leftmost chunk in `text`.
    pub fn find_chunk(&self, text: &str) -> Option<std::ops::Range<usize>> {
        self.pattern.find(text).map(|m| m.range())
    }

    /// Returns `true` if `text` contains at least one chunk.
    pub fn has_chunks(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Resolves every chunk in the content of `ctx`.
    ///
    /// Must be called from the worker thread: each chunk blocks on `bridge`.
    pub fn resolve(&self, ctx: &CommandContext, bridge: &DispatchBridge) -> DispatchResult<String> {
        let mut text = ctx.content().to_string();
        let mut expansions = 0;

        while let Some(range) = self.find_chunk(&text) {
            if expansions == self.max_expansions {
                warn!(limit = self.max_expansions, "Pipe expansion limit reached");
                return Err(DispatchError::ExpansionLimit {
                    limit: self.max_expansions,
                });
            }
            expansions += 1;

            let inner = text[range.start + 2..range.end - 1].to_string();
            let output = self.run_chunk(ctx, &inner, bridge)?;
            trace!(chunk = %inner, output = %output, "Substituting pipe chunk");
            text.replace_range(range, &output);
        }

        if expansions > 0 {
            debug!(expansions, resolved = %text, "Resolved pipes");
        }
        Ok(text)
    }

    /// Runs one chunk's inner text and returns what it produced.
    fn run_chunk(
        &self,
        ctx: &CommandContext,
        inner: &str,
        bridge: &DispatchBridge,
    ) -> DispatchResult<String> {
        let Some(invocation) = self.processor.parse(inner) else {
            debug!(chunk = %inner, "Malformed pipe chunk");
            return Ok(String::new());
        };

        let capture = Arc::new(PipeCapture::new());
        let piped = ctx.with_content(inner).with_sink(capture.clone());
        let processor = self.processor.clone();
        let result = bridge.call(async move { processor.invoke(piped, invocation).await });

        match result {
            Ok(()) => {}
            Err(e) if e.is_suppressed() => {
                debug!(chunk = %inner, error = %e, "Pipe chunk names no command");
            }
            Err(e) => match self.policy {
                PipeFailurePolicy::Degrade => {
                    warn!(chunk = %inner, error = %e, "Pipe chunk failed, substituting nothing");
                }
                PipeFailurePolicy::Abort => return Err(e),
            },
        }

        Ok(capture.take().unwrap_or_default())
    }
}

/// Builds the chunk pattern for `prefix`.
///
/// `$(` + prefix + a name of at least one character + anything without
/// `$`, `(` or `)` + `)`.
fn chunk_pattern(prefix: &str) -> Regex {
    let source = format!(r"\$\({}[^\s$()]+[^$()]*\)", regex::escape(prefix));
    Regex::new(&source).expect("escaped prefix always forms a valid pattern")
}
