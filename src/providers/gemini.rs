//! Google Gemini `generateContent` client.
//!
//! See: <https://ai.google.dev/api/generate-content>
//!
//! Two API surfaces are supported: the primary `v1beta` surface, which
//! accepts a `systemInstruction` and relaxed `safetySettings`, and the
//! legacy `v1` surface, where the system prompt is folded into the first
//! user turn. [`TieredExecutor`](super::TieredExecutor) combines the two.
//!
//! Gemini's safety filters sometimes refuse marketing copy. A blocked
//! answer is recorded as a warning and the next model in
//! [`MARKETING_SAFE_MODELS`] is tried.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use super::http::{DEFAULT_REQUEST_TIMEOUT, build_client, check_status, decode};
use super::params::{self, PreparedParams};
use super::traits::{Completion, ExecutionOptions, ModelDiscovery, ProviderExecutor};
use super::usage;
use crate::marketing::is_marketing_content;
use crate::types::{Message, ModelCapability, NormalizedModel, Provider, Role, Usage};
use crate::{OrchestratorError, Result};

/// Default base URL for the Gemini API.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Models tried in order for marketing content, least filter-prone first.
pub const MARKETING_SAFE_MODELS: &[&str] =
    &["gemini-1.5-flash", "gemini-2.0-flash", "gemini-1.5-flash-8b"];

/// Finish reasons that mean the candidate was suppressed.
const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
];

const SAFETY_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Gemini API surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeminiApi {
    /// `v1beta`: system instructions and safety settings.
    Primary,
    /// `v1`: plain contents only.
    Legacy,
}

impl GeminiApi {
    fn version(self) -> &'static str {
        match self {
            Self::Primary => "v1beta",
            Self::Legacy => "v1",
        }
    }
}

/// Client for one Gemini API surface.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    http: Client,
    base_url: String,
    api: GeminiApi,
}

/// Outcome of a single `generateContent` call.
#[derive(Debug)]
enum Generation {
    Text {
        text: String,
        usage: Usage,
        finish_reason: Option<String>,
    },
    Blocked {
        reason: String,
    },
}

impl GeminiClient {
    /// Create a primary-surface client against the public API.
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
            api: GeminiApi::Primary,
        }
    }

    /// The same client targeting another API surface.
    pub fn with_api(mut self, api: GeminiApi) -> Self {
        self.api = api;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.api.version(), path)
    }

    async fn generate(
        &self,
        messages: &[Message],
        model: &str,
        prepared: &PreparedParams,
    ) -> Result<Generation> {
        let body = self.build_request(messages, prepared);
        let url = self.endpoint(&format!("models/{model}:generateContent"));
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response, model).await?;
        let reply: GenerateResponse = decode(response).await?;

        if let Some(reason) = reply.prompt_feedback.and_then(|f| f.block_reason) {
            return Ok(Generation::Blocked { reason });
        }

        let candidate = reply.candidates.into_iter().next();
        let finish_reason = candidate.as_ref().and_then(|c| c.finish_reason.clone());
        let text: String = candidate
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return match finish_reason {
                Some(reason) if BLOCKING_FINISH_REASONS.contains(&reason.as_str()) => {
                    Ok(Generation::Blocked { reason })
                }
                _ => Err(OrchestratorError::EmptyResponse),
            };
        }

        Ok(Generation::Text {
            usage: usage::from_vendor(
                reply.usage_metadata,
                "promptTokenCount",
                "candidatesTokenCount",
                messages,
                &text,
            ),
            text,
            finish_reason,
        })
    }

    fn build_request(&self, messages: &[Message], prepared: &PreparedParams) -> GenerateRequest {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        let system = (!system.is_empty()).then(|| system.join("\n\n"));

        let mut contents: Vec<Content> = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| Content::text(Some(wire_role(m.role)), m.content.clone()))
            .collect();

        let system_instruction = match (self.api, system) {
            (GeminiApi::Primary, Some(system)) => Some(Content::text(None, system)),
            (GeminiApi::Legacy, Some(system)) => {
                match contents.iter_mut().find(|c| c.role == Some("user")) {
                    Some(first_user) => {
                        if let Some(part) = first_user.parts.first_mut() {
                            part.text = format!("{system}\n\n{}", part.text);
                        }
                    }
                    None => contents.insert(0, Content::text(Some("user"), system)),
                }
                None
            }
            (_, None) => None,
        };

        let safety_settings = match self.api {
            GeminiApi::Primary => SAFETY_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category: *category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
            GeminiApi::Legacy => Vec::new(),
        };

        GenerateRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                temperature: prepared.temperature,
                max_output_tokens: prepared.max_tokens,
                extras: generation_extras(&prepared.extras),
            },
            safety_settings,
        }
    }

    /// Models that support `generateContent`.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = self.endpoint("models");
        let response = self
            .http
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;
        let response = check_status(response, "models").await?;
        let list: ModelList = decode(response).await?;
        Ok(list
            .models
            .into_iter()
            .filter(|m| {
                m.supported_generation_methods
                    .iter()
                    .any(|method| method == "generateContent")
            })
            .map(|m| m.name.trim_start_matches("models/").to_string())
            .collect())
    }
}

/// Ordered models to try for one request.
fn candidate_models(model: &str, marketing: bool) -> Vec<String> {
    if !marketing {
        return vec![model.to_string()];
    }
    let mut candidates = Vec::with_capacity(MARKETING_SAFE_MODELS.len() + 1);
    // pro models are the most filter-prone; go straight to the safe list
    if !model.contains("-pro") {
        candidates.push(model.to_string());
    }
    candidates.extend(
        MARKETING_SAFE_MODELS
            .iter()
            .filter(|m| **m != model)
            .map(|m| m.to_string()),
    );
    candidates
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::Assistant => "model",
        Role::User | Role::System => "user",
    }
}

/// Rename supported extras to Gemini's `generationConfig` keys.
fn generation_extras(extras: &Map<String, Value>) -> Map<String, Value> {
    extras
        .iter()
        .map(|(name, value)| match name.as_str() {
            "top_p" => ("topP".to_string(), value.clone()),
            "top_k" => ("topK".to_string(), value.clone()),
            "stop" => (
                "stopSequences".to_string(),
                match value {
                    Value::Array(_) => value.clone(),
                    other => Value::Array(vec![other.clone()]),
                },
            ),
            other => (other.to_string(), value.clone()),
        })
        .collect()
}

#[async_trait]
impl ProviderExecutor for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    fn name(&self) -> &str {
        match self.api {
            GeminiApi::Primary => "gemini",
            GeminiApi::Legacy => "gemini-legacy",
        }
    }

    #[instrument(
        name = "gemini.complete",
        skip(self, messages, options),
        fields(model = %model, api = ?self.api)
    )]
    async fn complete(
        &self,
        messages: &[Message],
        model: &str,
        options: &ExecutionOptions,
    ) -> Result<Completion> {
        let prepared = params::prepare(Provider::Gemini, model, options);
        let mut warnings = prepared.warnings.clone();
        let candidates = candidate_models(model, is_marketing_content(messages));

        if candidates.first().map(String::as_str) != Some(model) {
            warnings.push(format!(
                "marketing content: skipped {model} in favour of {}",
                candidates.first().map(String::as_str).unwrap_or_default()
            ));
        }

        let mut blocked = Vec::new();
        let mut last_error = None;
        for candidate in &candidates {
            let generation = match self.generate(messages, candidate, &prepared).await {
                Ok(generation) => generation,
                Err(
                    e @ (OrchestratorError::ModelNotFound(_) | OrchestratorError::EmptyResponse),
                ) => {
                    warn!(model = %candidate, error = %e, "gemini candidate produced no text");
                    warnings.push(format!("gemini {candidate} unusable: {e}"));
                    last_error = Some(e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            match generation {
                Generation::Text {
                    text,
                    usage,
                    finish_reason,
                } => {
                    return Ok(Completion {
                        text,
                        usage,
                        model: candidate.clone(),
                        warnings,
                        finish_reason,
                    });
                }
                Generation::Blocked { reason } => {
                    warn!(model = %candidate, reason = %reason, "gemini safety filter blocked");
                    warnings.push(format!("gemini safety filter blocked {candidate} ({reason})"));
                    blocked.push(candidate.as_str());
                    last_error = Some(OrchestratorError::ContentFiltered {
                        reason: format!("blocked on {} ({reason})", blocked.join(", ")),
                    });
                }
            }
        }

        debug!(attempted = candidates.len(), "no gemini candidate produced text");
        Err(last_error.unwrap_or(OrchestratorError::EmptyResponse))
    }
}

#[async_trait]
impl ModelDiscovery for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn discover(&self) -> Result<Vec<NormalizedModel>> {
        Ok(self
            .list_models()
            .await?
            .into_iter()
            .filter(|id| id.starts_with("gemini-"))
            .map(|id| {
                NormalizedModel::new(Provider::Gemini, id, u32::MAX)
                    .with_capability(ModelCapability::Vision)
                    .with_max_output_tokens(params::max_output_ceiling(Provider::Gemini, ""))
            })
            .collect())
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&'static str>, text: String) -> Self {
        Self {
            role,
            parts: vec![Part { text }],
        }
    }
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    max_output_tokens: u32,
    #[serde(flatten)]
    extras: Map<String, Value>,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelEntry {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}
