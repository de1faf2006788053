//! Provider and tier identifiers.
//!
//! [`Provider`] names one of the three concrete vendors. Requests carry a
//! [`ProviderChoice`], which additionally allows `auto`. Both parse from
//! strings case-insensitively and accept the vendor aliases `anthropic`
//! and `google`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::OrchestratorError;

/// A concrete AI vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Provider {
    OpenAi,
    Claude,
    Gemini,
}

impl Provider {
    /// All providers, in catalog/report order.
    pub const ALL: [Provider; 3] = [Provider::OpenAi, Provider::Claude, Provider::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Claude => "claude",
            Provider::Gemini => "gemini",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "claude" | "anthropic" => Ok(Provider::Claude),
            "gemini" | "google" => Ok(Provider::Gemini),
            other => Err(OrchestratorError::InvalidInput(format!(
                "unknown provider '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for Provider {
    type Error = OrchestratorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Provider> for String {
    fn from(value: Provider) -> Self {
        value.as_str().to_string()
    }
}

/// Provider requested by the caller: a specific vendor or `auto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProviderChoice {
    #[default]
    Auto,
    Explicit(Provider),
}

impl ProviderChoice {
    /// The concrete provider, if one was named.
    pub fn explicit(&self) -> Option<Provider> {
        match self {
            ProviderChoice::Auto => None,
            ProviderChoice::Explicit(p) => Some(*p),
        }
    }
}

impl From<Provider> for ProviderChoice {
    fn from(value: Provider) -> Self {
        ProviderChoice::Explicit(value)
    }
}

impl FromStr for ProviderChoice {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") || s.trim().is_empty() {
            return Ok(ProviderChoice::Auto);
        }
        s.parse().map(ProviderChoice::Explicit)
    }
}

impl TryFrom<String> for ProviderChoice {
    type Error = OrchestratorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProviderChoice> for String {
    fn from(value: ProviderChoice) -> Self {
        match value {
            ProviderChoice::Auto => "auto".to_string(),
            ProviderChoice::Explicit(p) => p.into(),
        }
    }
}

/// Coarse quality/speed class used for auto-selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModelTier {
    Flagship,
    Standard,
    Fast,
    #[default]
    Auto,
}

impl ModelTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::Flagship => "flagship",
            ModelTier::Standard => "standard",
            ModelTier::Fast => "fast",
            ModelTier::Auto => "auto",
        }
    }
}

impl FromStr for ModelTier {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flagship" => Ok(ModelTier::Flagship),
            "standard" => Ok(ModelTier::Standard),
            "fast" => Ok(ModelTier::Fast),
            "auto" | "" => Ok(ModelTier::Auto),
            other => Err(OrchestratorError::InvalidInput(format!(
                "unknown model tier '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for ModelTier {
    type Error = OrchestratorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ModelTier> for String {
    fn from(value: ModelTier) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_aliases() {
        assert_eq!("Anthropic".parse::<Provider>().unwrap(), Provider::Claude);
        assert_eq!("google".parse::<Provider>().unwrap(), Provider::Gemini);
        assert_eq!(" OPENAI ".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert!("mistral".parse::<Provider>().is_err());
    }

    #[test]
    fn provider_choice_auto() {
        assert_eq!("auto".parse::<ProviderChoice>().unwrap(), ProviderChoice::Auto);
        assert_eq!(
            "claude".parse::<ProviderChoice>().unwrap(),
            ProviderChoice::Explicit(Provider::Claude)
        );
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&ProviderChoice::Explicit(Provider::OpenAi)).unwrap();
        assert_eq!(json, "\"openai\"");
        let tier: ModelTier = serde_json::from_str("\"Flagship\"").unwrap();
        assert_eq!(tier, ModelTier::Flagship);
        assert!(serde_json::from_str::<ModelTier>("\"premium\"").is_err());
    }
}
