//! Completion request type.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::message::Message;
use super::provider::{ModelTier, ProviderChoice};
use crate::{OrchestratorError, Result};

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Default output token budget.
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// A provider-agnostic completion request.
///
/// `temperature` nominally accepts [0, 2]; executors clamp it to [0, 1].
/// `parameters` carries extra vendor sampling options (`top_p`, `top_k`,
/// `stop`, `frequency_penalty`, `presence_penalty`, `logprobs`), which are
/// forwarded or dropped per provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub provider: ProviderChoice,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub model_tier: ModelTier,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

impl CompletionRequest {
    /// Create a request with default settings (`auto` provider and tier).
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            provider: ProviderChoice::Auto,
            model: None,
            model_tier: ModelTier::Auto,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            stream: false,
            metadata: None,
            parameters: None,
        }
    }

    /// Coerce a free-form JSON mapping into a request.
    ///
    /// Provider and tier strings are parsed case-insensitively.
    pub fn from_value(value: Value) -> Result<Self> {
        let request: CompletionRequest = serde_json::from_value(value)
            .map_err(|e| OrchestratorError::InvalidInput(e.to_string()))?;
        request.validate()?;
        Ok(request)
    }

    pub fn provider(mut self, provider: impl Into<ProviderChoice>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn model_tier(mut self, tier: ModelTier) -> Self {
        self.model_tier = tier;
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Set an extra sampling parameter.
    pub fn parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters
            .get_or_insert_with(Map::new)
            .insert(name.into(), value);
        self
    }

    /// Check the boundary invariants.
    pub fn validate(&self) -> Result<()> {
        if self.messages.is_empty() {
            return Err(OrchestratorError::InvalidInput(
                "messages must not be empty".into(),
            ));
        }
        if !self.temperature.is_finite() || !(0.0..=2.0).contains(&self.temperature) {
            return Err(OrchestratorError::InvalidInput(format!(
                "temperature must be within [0, 2], got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(OrchestratorError::InvalidInput(
                "max_tokens must be positive".into(),
            ));
        }
        Ok(())
    }
}
