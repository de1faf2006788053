//! Anthropic Messages API client.
//!
//! See: <https://docs.anthropic.com/en/api/messages>
//!
//! Anthropic has no model-listing endpoint usable for validation, so
//! discovery probes each known model with a one-token request. Models the
//! API reports as missing are kept in the listing, marked deprecated.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use super::http::{DEFAULT_REQUEST_TIMEOUT, build_client, check_status, decode};
use super::params;
use super::traits::{Completion, ExecutionOptions, ModelDiscovery, ProviderExecutor};
use super::usage;
use crate::catalog::preference_table;
use crate::types::{Message, ModelCapability, NormalizedModel, Provider, Role};
use crate::{OrchestratorError, Result};

/// Default base URL for the Anthropic API.
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// API version sent with every request.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Client for the Anthropic Messages API.
#[derive(Clone)]
pub struct ClaudeClient {
    api_key: String,
    http: Client,
    base_url: String,
}

impl ClaudeClient {
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

    /// Send a one-token request to check that `model` is served.
    pub async fn probe(&self, model: &str) -> Result<()> {
        let messages = [Message::user("ping")];
        self.complete(&messages, model, &ExecutionOptions::new(0.0, 1))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl ProviderExecutor for ClaudeClient {
    fn provider(&self) -> Provider {
        Provider::Claude
    }

    #[instrument(name = "claude.complete", skip(self, messages, options), fields(model = %model))]
    async fn complete(
        &self,
        messages: &[Message],
        model: &str,
        options: &ExecutionOptions,
    ) -> Result<Completion> {
        let prepared = params::prepare(Provider::Claude, model, options);

        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        let conversation: Vec<WireMessage<'_>> = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| WireMessage {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect();
        if conversation.is_empty() {
            return Err(OrchestratorError::InvalidInput(
                "claude requires at least one user or assistant message".to_string(),
            ));
        }

        let mut extras = prepared.extras;
        if let Some(stop) = extras.remove("stop") {
            extras.insert("stop_sequences".to_string(), as_array(stop));
        }

        let body = MessagesRequest {
            model,
            max_tokens: prepared.max_tokens,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages: conversation,
            temperature: prepared.temperature,
            extras,
        };

        let url = format!("{}/v1/messages", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response, model).await?;
        let reply: MessagesResponse = decode(response).await?;

        let text: String = reply
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();
        // a one-token probe may legitimately produce no text
        if text.trim().is_empty() && prepared.max_tokens > 1 {
            return Err(OrchestratorError::EmptyResponse);
        }

        Ok(Completion {
            usage: usage::from_vendor(
                reply.usage,
                "input_tokens",
                "output_tokens",
                messages,
                &text,
            ),
            text,
            model: model.to_string(),
            warnings: prepared.warnings,
            finish_reason: reply.stop_reason,
        })
    }
}

#[async_trait]
impl ModelDiscovery for ClaudeClient {
    fn provider(&self) -> Provider {
        Provider::Claude
    }

    /// Probe every known model.
    ///
    /// A 404 marks the model deprecated. Fails only when no probe succeeded
    /// and at least one failed for a reason other than 404.
    async fn discover(&self) -> Result<Vec<NormalizedModel>> {
        let mut models = Vec::new();
        let mut available = 0usize;
        let mut last_error = None;

        for id in preference_table(Provider::Claude) {
            let model = NormalizedModel::new(Provider::Claude, *id, u32::MAX)
                .with_capability(ModelCapability::Vision)
                .with_max_output_tokens(params::max_output_ceiling(Provider::Claude, id));
            match self.probe(id).await {
                Ok(()) => {
                    available += 1;
                    models.push(model);
                }
                Err(e) if e.is_not_found() => {
                    debug!(model = %id, "claude model not found, marking deprecated");
                    models.push(model.mark_deprecated());
                }
                Err(e) => {
                    warn!(model = %id, error = %e, "claude model probe failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if available == 0 => Err(e),
            _ => Ok(models),
        }
    }
}

/// Normalize a `stop` value to the array form Anthropic expects.
fn as_array(value: Value) -> Value {
    match value {
        Value::Array(_) => value,
        other => Value::Array(vec![other]),
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(flatten)]
    extras: Map<String, Value>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<Value>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stop_becomes_array() {
        assert_eq!(as_array(json!("END")), json!(["END"]));
        assert_eq!(as_array(json!(["a", "b"])), json!(["a", "b"]));
    }

    #[test]
    fn system_prompt_lifted_out_of_messages() {
        let body = MessagesRequest {
            model: "claude-3-5-sonnet-20241022",
            max_tokens: 10,
            system: Some("be brief".into()),
            messages: vec![WireMessage {
                role: "user",
                content: "hi",
            }],
            temperature: Some(0.3),
            extras: Map::new(),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["system"], "be brief");
        assert_eq!(value["messages"].as_array().unwrap().len(), 1);
    }
}
