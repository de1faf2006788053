//! Response and streaming event types

use serde::{Deserialize, Serialize};

/// Content returned when every provider in the fallback chain failed.
pub const APOLOGY_MESSAGE: &str =
    "I'm sorry, but I'm unable to generate a response right now. Please try again in a moment.";

/// Normalized completion result.
///
/// Produced once per request and never mutated afterwards (a cache hit
/// hands out a copy flagged `cached`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub success: bool,
    pub content: String,
    pub provider: String,
    pub model: String,
    pub usage: Usage,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompletionResponse {
    /// A failed response carrying no content (configuration or input error).
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// The user-safe response returned when the whole fallback chain failed.
    pub fn apology(original_error: &str, warnings: Vec<String>) -> Self {
        Self {
            success: false,
            content: APOLOGY_MESSAGE.to_string(),
            warnings,
            error: Some(original_error.to_string()),
            ..Default::default()
        }
    }

    /// Copy of this response flagged as served from cache.
    pub(crate) fn as_cached(&self) -> Self {
        Self {
            cached: true,
            ..self.clone()
        }
    }
}

/// Token usage statistics.
///
/// `input_tokens`/`output_tokens`/`total_tokens` are always populated;
/// `estimated` is set when they were derived from word counts because the
/// vendor did not report them. `raw` keeps the vendor's own usage object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
    #[serde(default)]
    pub estimated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl Usage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
            estimated: false,
            raw: None,
        }
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }
}

/// Events emitted by [`Orchestrator::stream()`](crate::Orchestrator::stream).
///
/// The stream is emulated: one `Content` event carrying the entire text,
/// followed by `Done`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Content { content: String },
    Done(StreamSummary),
}

/// Trailer emitted at the end of a stream.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StreamSummary {
    pub success: bool,
    pub provider: String,
    pub model: String,
    pub usage: Usage,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<CompletionResponse> for StreamSummary {
    fn from(response: CompletionResponse) -> Self {
        Self {
            success: response.success,
            provider: response.provider,
            model: response.model,
            usage: response.usage,
            warnings: response.warnings,
            error: response.error,
        }
    }
}
