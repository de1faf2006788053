//! Token usage normalization.
//!
//! Vendors report usage under different field names; when they report
//! nothing, counts are estimated from word counts (four tokens per three
//! words, rounded up) and flagged `estimated`.

use serde_json::Value;

use crate::types::{Message, Usage};

/// Estimated token count for `text`.
pub fn estimate_tokens(text: &str) -> u32 {
    let words = text.split_whitespace().count() as u32;
    words.saturating_mul(4).div_ceil(3)
}

/// Usage estimated from the prompt and the generated text.
pub fn estimated_usage(messages: &[Message], output: &str) -> Usage {
    let input = messages
        .iter()
        .map(|m| estimate_tokens(&m.content))
        .fold(0u32, u32::saturating_add);
    Usage {
        estimated: true,
        ..Usage::new(input, estimate_tokens(output))
    }
}

/// Build [`Usage`] from a vendor usage object, falling back to an estimate.
///
/// `input_key`/`output_key` name the vendor's fields (e.g. `prompt_tokens`).
pub(crate) fn from_vendor(
    raw: Option<Value>,
    input_key: &str,
    output_key: &str,
    messages: &[Message],
    output: &str,
) -> Usage {
    let Some(raw) = raw else {
        return estimated_usage(messages, output);
    };
    let field = |key: &str| raw.get(key).and_then(Value::as_u64).map(|n| n as u32);
    match (field(input_key), field(output_key)) {
        (Some(input), Some(output_tokens)) => Usage::new(input, output_tokens).with_raw(raw),
        _ => {
            let mut usage = estimated_usage(messages, output);
            usage.raw = Some(raw);
            usage
        }
    }
}
