//! Provider-specific parameter handling.
//!
//! All "this vendor accepts it *this* way" logic for sampling settings lives
//! here: temperature clamping, per-model output-token ceilings, and the
//! list of optional parameters each vendor understands. Every adjustment is
//! reported as a human-readable warning that ends up on the response.

use serde_json::{Map, Value};
use tracing::debug;

use super::traits::ExecutionOptions;
use crate::types::Provider;

const OPENAI_PARAMETERS: &[&str] = &[
    "top_p",
    "stop",
    "frequency_penalty",
    "presence_penalty",
    "logprobs",
];
const CLAUDE_PARAMETERS: &[&str] = &["top_p", "stop"];
const GEMINI_PARAMETERS: &[&str] = &["top_p", "top_k", "stop"];

/// Sampling settings after vendor-specific adjustment.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PreparedParams {
    /// `None` when the target model does not accept a temperature at all.
    pub temperature: Option<f64>,
    pub max_tokens: u32,
    /// Supported optional parameters, keyed by their caller-facing names.
    pub extras: Map<String, Value>,
    pub warnings: Vec<String>,
}

/// Optional parameters `provider` accepts through `parameters`.
pub fn supported_parameters(provider: Provider) -> &'static [&'static str] {
    match provider {
        Provider::OpenAi => OPENAI_PARAMETERS,
        Provider::Claude => CLAUDE_PARAMETERS,
        Provider::Gemini => GEMINI_PARAMETERS,
    }
}

/// Largest `max_tokens` value `model` accepts.
pub fn max_output_ceiling(provider: Provider, model: &str) -> u32 {
    match provider {
        Provider::OpenAi => {
            if is_openai_reasoning_model(model) {
                32_768
            } else if model.starts_with("gpt-4o") {
                16_384
            } else {
                4_096
            }
        }
        Provider::Claude => {
            const EXTENDED: &[&str] =
                &["claude-3-5", "claude-3-7", "sonnet-4", "opus-4", "haiku-4"];
            if EXTENDED.iter().any(|family| model.contains(family)) {
                8_192
            } else {
                4_096
            }
        }
        Provider::Gemini => 8_192,
    }
}

/// OpenAI `o1`/`o3` models take `max_completion_tokens` and no temperature.
pub(crate) fn is_openai_reasoning_model(model: &str) -> bool {
    model.starts_with("o1") || model.starts_with("o3")
}

/// Clamp and filter `options` for one vendor/model pair.
pub(crate) fn prepare(
    provider: Provider,
    model: &str,
    options: &ExecutionOptions,
) -> PreparedParams {
    let mut warnings = Vec::new();

    let temperature = if provider == Provider::OpenAi && is_openai_reasoning_model(model) {
        warnings.push(format!(
            "temperature is not supported by {model} and was dropped"
        ));
        None
    } else {
        let clamped = options.temperature.clamp(0.0, 1.0);
        if clamped != options.temperature {
            warnings.push(format!(
                "temperature {} clamped to {clamped} for {provider}",
                options.temperature
            ));
        }
        Some(clamped)
    };

    let ceiling = max_output_ceiling(provider, model);
    let max_tokens = if options.max_tokens > ceiling {
        warnings.push(format!(
            "max_tokens {} exceeds the {ceiling}-token limit of {model}; clamped to {ceiling}",
            options.max_tokens
        ));
        ceiling
    } else {
        options.max_tokens
    };

    let supported = supported_parameters(provider);
    let mut extras = Map::new();
    for (name, value) in &options.parameters {
        if supported.contains(&name.as_str()) {
            extras.insert(name.clone(), value.clone());
        } else {
            debug!(provider = %provider, parameter = %name, "dropping unsupported parameter");
            warnings.push(format!(
                "parameter '{name}' is not supported by {provider} and was dropped"
            ));
        }
    }

    PreparedParams {
        temperature,
        max_tokens,
        extras,
        warnings,
    }
}
