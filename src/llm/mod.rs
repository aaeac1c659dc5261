//! Language model gateway.
//!
//! The pipeline only ever needs a single-turn completion, so the seam is the
//! [`LlmGateway`] trait. [`AnthropicClient`] implements it over the Anthropic
//! Messages API.

mod client;
mod types;

pub use client::*;
pub use types::*;

use async_trait::async_trait;

use crate::error::LlmResult;

/// Single-turn text completion with deterministic sampling.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Complete `prompt`, producing at most `max_tokens` tokens.
    ///
    /// Implementations sample at temperature zero and return the
    /// completion text trimmed of surrounding whitespace.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> LlmResult<String>;
}
