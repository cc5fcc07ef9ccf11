//! Prompting client
//!
//! One request/response exchange with a vision-capable model. Streaming only
//! changes transport (long generations stay under HTTP timeouts); the
//! returned [`Completion`] is the same either way.

mod anthropic;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use anthropic::{AnthropicClient, DEFAULT_MODEL};

/// One part of a multimodal prompt
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Image { media_type: String, data: Vec<u8> },
    Text(String),
}

impl ContentPart {
    pub fn png(data: Vec<u8>) -> Self {
        ContentPart::Image {
            media_type: "image/png".to_string(),
            data,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text(text.into())
    }
}

/// Why the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    Other,
}

impl StopReason {
    pub fn from_api(reason: &str) -> Self {
        match reason {
            "end_turn" | "stop" => StopReason::EndTurn,
            "max_tokens" | "length" => StopReason::MaxTokens,
            "stop_sequence" => StopReason::StopSequence,
            _ => StopReason::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::EndTurn => "end_turn",
            StopReason::MaxTokens => "max_tokens",
            StopReason::StopSequence => "stop_sequence",
            StopReason::Other => "other",
        }
    }

    /// Output was cut off by the token ceiling
    pub fn is_truncated(&self) -> bool {
        matches!(self, StopReason::MaxTokens)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub stop_reason: StopReason,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("API error ({kind}): {message}")]
    Api { kind: String, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("authentication failed, check ANTHROPIC_API_KEY")]
    AuthFailed,

    #[error("rate limited{}", retry_hint(.retry_after))]
    RateLimited { retry_after: Option<Duration> },
}

fn retry_hint(retry_after: &Option<Duration>) -> String {
    retry_after
        .map(|d| format!(", retry after {}s", d.as_secs()))
        .unwrap_or_default()
}

#[async_trait]
pub trait PromptingClient: Send + Sync {
    /// Sends one multimodal prompt and returns the full text
    ///
    /// # Arguments
    /// * `content` - Ordered prompt parts (page images, then instructions)
    /// * `max_tokens` - Generation ceiling
    /// * `stream` - Use server-sent events for the response
    async fn complete(
        &self,
        content: &[ContentPart],
        max_tokens: u32,
        stream: bool,
    ) -> Result<Completion, LlmError>;
}
