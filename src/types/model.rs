//! Model information types.
//!
//! Types for describing discovered models, their capabilities, and rank.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::provider::Provider;

/// Label suffix applied to models that failed validation.
pub const UNAVAILABLE_SUFFIX: &str = " (Unavailable)";

/// A capability that a model may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelCapability {
    /// Multi-turn chat conversations.
    Chat,
    /// Image inputs.
    Vision,
    /// Batch API support.
    Batch,
}

/// A provider-agnostic record describing one discoverable model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedModel {
    pub provider: Provider,
    /// Vendor model identifier (e.g. "gpt-4o", "gemini-1.5-flash").
    pub id: String,
    /// Human-readable label.
    pub label: String,
    /// Preference rank, lower is preferred.
    pub rank: u32,
    pub capabilities: Vec<ModelCapability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(default)]
    pub deprecated: bool,
    pub last_seen: DateTime<Utc>,
}

impl NormalizedModel {
    /// Create a chat-capable model record with a label derived from the id.
    pub fn new(provider: Provider, id: impl Into<String>, rank: u32) -> Self {
        let id = id.into();
        Self {
            provider,
            label: label_for(&id),
            id,
            rank,
            capabilities: vec![ModelCapability::Chat],
            max_output_tokens: None,
            deprecated: false,
            last_seen: Utc::now(),
        }
    }

    /// Add a capability to this model.
    pub fn with_capability(mut self, cap: ModelCapability) -> Self {
        if !self.capabilities.contains(&cap) {
            self.capabilities.push(cap);
        }
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Mark the model as unavailable, keeping it visible in listings.
    pub fn mark_deprecated(mut self) -> Self {
        if !self.deprecated {
            self.deprecated = true;
            self.label.push_str(UNAVAILABLE_SUFFIX);
        }
        self
    }

    pub fn supports(&self, cap: ModelCapability) -> bool {
        self.capabilities.contains(&cap)
    }
}

/// Derive a display label from a model id: `gpt-4o-mini` → `GPT 4o Mini`.
fn label_for(id: &str) -> String {
    id.split('-')
        .map(|part| match part {
            "gpt" => "GPT".to_string(),
            _ => {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) if first.is_ascii_alphabetic() => {
                        first.to_ascii_uppercase().to_string() + chars.as_str()
                    }
                    _ => part.to_string(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
