//! Provider/model routing tables.
//!
//! Static defaults used by selection: the per-tier routes, per-provider
//! default models, the marketing route, and the fallback chain walked when
//! the selected route fails.

use std::fmt;

use serde::Serialize;

use crate::types::{ModelTier, Provider};

/// A (provider, model) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Route {
    pub provider: Provider,
    pub model: String,
}

impl Route {
    pub fn new(provider: Provider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

/// Route used for marketing content unless overridden on the builder.
pub const MARKETING_ROUTE: (Provider, &str) = (Provider::Gemini, "gemini-1.5-flash");

/// Routes tried, in order, after the selected route fails.
pub const FALLBACK_CHAIN: &[(Provider, &str)] = &[
    (Provider::Gemini, "gemini-1.5-flash"),
    (Provider::Claude, "claude-3-5-sonnet-20241022"),
    (Provider::OpenAi, "gpt-4o"),
    (Provider::Gemini, "gemini-1.5-pro"),
];

/// Model used for an explicit provider when neither the caller nor the
/// catalog names one.
pub fn default_model(provider: Provider) -> &'static str {
    match provider {
        Provider::OpenAi => "gpt-4o",
        Provider::Claude => "claude-3-5-sonnet-20241022",
        Provider::Gemini => "gemini-1.5-flash",
    }
}

/// Auto-selection route for a tier.
pub fn tier_route(tier: ModelTier) -> Route {
    match tier {
        ModelTier::Flagship => Route::new(Provider::Claude, "claude-3-5-sonnet-20241022"),
        ModelTier::Fast => Route::new(Provider::Gemini, "gemini-1.5-flash"),
        ModelTier::Standard | ModelTier::Auto => Route::new(Provider::OpenAi, "gpt-4o"),
    }
}

/// Provider that serves a model id, judged by its family prefix.
pub fn provider_for_model(model: &str) -> Option<Provider> {
    if model.starts_with("gpt-")
        || model.starts_with("chatgpt-")
        || model.starts_with("o1")
        || model.starts_with("o3")
    {
        Some(Provider::OpenAi)
    } else if model.starts_with("claude-") {
        Some(Provider::Claude)
    } else if model.starts_with("gemini-") {
        Some(Provider::Gemini)
    } else {
        None
    }
}

/// Fallback routes after `failed`, in chain order, skipping `failed` itself.
pub fn fallback_routes(failed: &Route) -> impl Iterator<Item = Route> + '_ {
    FALLBACK_CHAIN
        .iter()
        .map(|(provider, model)| Route::new(*provider, *model))
        .filter(move |route| route != failed)
}
