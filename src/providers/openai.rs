//! OpenAI chat completions client.
//!
//! See: <https://platform.openai.com/docs/api-reference/chat>

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;

use super::http::{DEFAULT_REQUEST_TIMEOUT, build_client, check_status, decode};
use super::params::{self, is_openai_reasoning_model};
use super::traits::{Completion, ExecutionOptions, ModelDiscovery, ProviderExecutor};
use super::usage;
use crate::types::{Message, ModelCapability, NormalizedModel, Provider};
use crate::{OrchestratorError, Result};

/// Default base URL for the OpenAI API.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Id fragments of models that are not chat models.
const NON_CHAT_MARKERS: &[&str] = &[
    "instruct",
    "audio",
    "realtime",
    "transcribe",
    "tts",
    "search",
    "embedding",
    "image",
];

/// Client for OpenAI chat completions and model listing.
#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    http: Client,
    base_url: String,
}

impl OpenAiClient {
    /// Create a client against the public API.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        Ok(Self::with_http_client(
            api_key,
            base_url,
            build_client(DEFAULT_REQUEST_TIMEOUT)?,
        ))
    }

    /// Create a client sharing an existing HTTP client.
    pub fn with_http_client(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        http: Client,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Ids of all models visible to this key.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let response = check_status(response, "models").await?;
        let list: ModelList = decode(response).await?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }
}

/// Whether an OpenAI model id names a chat-capable model.
pub(crate) fn is_chat_model(id: &str) -> bool {
    let family = id.starts_with("gpt-")
        || id.starts_with("chatgpt-")
        || is_openai_reasoning_model(id);
    family && !NON_CHAT_MARKERS.iter().any(|m| id.contains(m))
}

#[async_trait]
impl ProviderExecutor for OpenAiClient {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    #[instrument(name = "openai.complete", skip(self, messages, options), fields(model = %model))]
    async fn complete(
        &self,
        messages: &[Message],
        model: &str,
        options: &ExecutionOptions,
    ) -> Result<Completion> {
        let prepared = params::prepare(Provider::OpenAi, model, options);
        let reasoning = is_openai_reasoning_model(model);

        let body = ChatRequest {
            model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: prepared.temperature,
            max_tokens: (!reasoning).then_some(prepared.max_tokens),
            max_completion_tokens: reasoning.then_some(prepared.max_tokens),
            extras: prepared.extras,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response, model).await?;
        let chat: ChatResponse = decode(response).await?;

        let choice = chat
            .choices
            .into_iter()
            .next()
            .ok_or(OrchestratorError::EmptyResponse)?;
        let text = match choice.message.content {
            Some(text) if !text.trim().is_empty() => text,
            _ => {
                return Err(match choice.message.refusal {
                    Some(reason) => OrchestratorError::ContentFiltered { reason },
                    None => OrchestratorError::EmptyResponse,
                });
            }
        };

        Ok(Completion {
            usage: usage::from_vendor(
                chat.usage,
                "prompt_tokens",
                "completion_tokens",
                messages,
                &text,
            ),
            text,
            model: model.to_string(),
            warnings: prepared.warnings,
            finish_reason: choice.finish_reason,
        })
    }
}

#[async_trait]
impl ModelDiscovery for OpenAiClient {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    async fn discover(&self) -> Result<Vec<NormalizedModel>> {
        let models = self
            .list_models()
            .await?
            .into_iter()
            .filter(|id| is_chat_model(id))
            .map(|id| {
                let ceiling = params::max_output_ceiling(Provider::OpenAi, &id);
                let model = NormalizedModel::new(Provider::OpenAi, id, u32::MAX)
                    .with_max_output_tokens(ceiling);
                if model.id.starts_with("gpt-4o") || model.id.starts_with("gpt-4-turbo") {
                    model.with_capability(ModelCapability::Vision)
                } else {
                    model
                }
            })
            .collect();
        Ok(models)
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(flatten)]
    extras: Map<String, Value>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Value>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}
