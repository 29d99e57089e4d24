//! AI backend boundary.
//!
//! The core never talks to a model directly; it hands a prompt to an
//! [`AiBackend`] and gets text back. Task-list parsing and fallback handling
//! live in the planner, not here.

use async_trait::async_trait;

use crate::error::Result;

/// Token usage reported by the backend for one call.
///
/// The planner estimates tokens before a call for rate-limit admission and
/// records these reported numbers afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl BackendUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// One backend completion: raw response text plus reported usage.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub text: String,
    pub usage: BackendUsage,
}

/// Text-in, text-out AI backend.
#[async_trait]
pub trait AiBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<BackendResponse>;
}

/// Rough token estimate for admission control before a call is made.
///
/// Four characters per token is the conventional heuristic; the limiter
/// records backend-reported truth afterwards, so precision here only affects
/// how early a wait begins.
pub fn estimate_tokens(text: &str) -> u32 {
    (text.len() / 4).max(1) as u32
}
