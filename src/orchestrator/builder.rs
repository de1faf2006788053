//! Builder for configuring orchestrator instances

use std::sync::Arc;
use std::time::Duration;

use super::Orchestrator;
use super::routing::{MARKETING_ROUTE, Route};
use crate::Result;
use crate::cache::{CacheConfig, ResponseCache};
use crate::catalog::{DEFAULT_CATALOG_TTL, ModelCatalog};
use crate::health::{HealthConfig, HealthProbe};
use crate::providers::http::{DEFAULT_REQUEST_TIMEOUT, build_client};
use crate::providers::{
    ClaudeClient, ExecutorRegistry, GeminiApi, GeminiClient, ModelDiscovery, OpenAiClient,
    ProviderExecutor, RetryConfig, TieredExecutor,
};
use crate::types::Provider;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Builder for configuring orchestrator instances.
///
/// A provider is configured by supplying its API key; providers without a
/// key are reported as not configured and never called.
///
/// ```rust,no_run
/// # use emailpilot_ai::Orchestrator;
/// # fn main() -> emailpilot_ai::Result<()> {
/// let orchestrator = Orchestrator::builder()
///     .openai(std::env::var("OPENAI_API_KEY").unwrap_or_default())
///     .gemini("...")
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct OrchestratorBuilder {
    openai_key: Option<String>,
    anthropic_key: Option<String>,
    gemini_key: Option<String>,
    openai_base_url: String,
    anthropic_base_url: String,
    gemini_base_url: String,
    timeout: Duration,
    response_cache: Option<CacheConfig>,
    catalog_ttl: Duration,
    health: HealthConfig,
    retry: Option<RetryConfig>,
    marketing_route: Option<Route>,
    executors: Vec<Arc<dyn ProviderExecutor>>,
    discovery: Vec<Arc<dyn ModelDiscovery>>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            openai_key: None,
            anthropic_key: None,
            gemini_key: None,
            openai_base_url: OPENAI_BASE_URL.to_string(),
            anthropic_base_url: ANTHROPIC_BASE_URL.to_string(),
            gemini_base_url: GEMINI_BASE_URL.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            response_cache: Some(CacheConfig::default()),
            catalog_ttl: DEFAULT_CATALOG_TTL,
            health: HealthConfig::default(),
            retry: None,
            marketing_route: Some(Route::new(MARKETING_ROUTE.0, MARKETING_ROUTE.1)),
            executors: Vec::new(),
            discovery: Vec::new(),
        }
    }

    /// Configure OpenAI. Empty keys are ignored.
    pub fn openai(mut self, api_key: impl Into<String>) -> Self {
        self.openai_key = non_empty(api_key.into());
        self
    }

    /// Configure Anthropic Claude. Empty keys are ignored.
    pub fn anthropic(mut self, api_key: impl Into<String>) -> Self {
        self.anthropic_key = non_empty(api_key.into());
        self
    }

    /// Configure Google Gemini. Empty keys are ignored.
    pub fn gemini(mut self, api_key: impl Into<String>) -> Self {
        self.gemini_key = non_empty(api_key.into());
        self
    }

    /// Override the OpenAI base URL (for testing with wiremock).
    pub fn openai_base_url(mut self, url: impl Into<String>) -> Self {
        self.openai_base_url = url.into();
        self
    }

    pub fn anthropic_base_url(mut self, url: impl Into<String>) -> Self {
        self.anthropic_base_url = url.into();
        self
    }

    pub fn gemini_base_url(mut self, url: impl Into<String>) -> Self {
        self.gemini_base_url = url.into();
        self
    }

    /// Per-request HTTP timeout for vendor calls (default: 60s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure the response cache (on by default).
    pub fn response_cache(mut self, config: CacheConfig) -> Self {
        self.response_cache = Some(config);
        self
    }

    pub fn disable_response_cache(mut self) -> Self {
        self.response_cache = None;
        self
    }

    /// Model catalog TTL (default: 6 hours).
    pub fn catalog_ttl(mut self, ttl: Duration) -> Self {
        self.catalog_ttl = ttl;
        self
    }

    pub fn health_config(mut self, config: HealthConfig) -> Self {
        self.health = config;
        self
    }

    /// Retry transient executor errors before falling back (off by default).
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    /// Route marketing content to `provider`/`model`.
    pub fn marketing_route(mut self, provider: Provider, model: impl Into<String>) -> Self {
        self.marketing_route = Some(Route::new(provider, model));
        self
    }

    /// Never override selection for marketing content.
    pub fn disable_marketing_route(mut self) -> Self {
        self.marketing_route = None;
        self
    }

    /// Register a custom executor, replacing the built-in one for its provider.
    pub fn executor(mut self, executor: Arc<dyn ProviderExecutor>) -> Self {
        self.executors.push(executor);
        self
    }

    /// Register a custom discovery source, replacing the built-in one for its provider.
    pub fn discovery(mut self, source: Arc<dyn ModelDiscovery>) -> Self {
        self.discovery.push(source);
        self
    }

    /// Build the orchestrator.
    pub fn build(self) -> Result<Orchestrator> {
        let http = build_client(self.timeout)?;

        let mut registry = ExecutorRegistry::new();
        if let Some(config) = self.retry {
            registry.set_retry_config(config);
        }
        let mut catalog = ModelCatalog::new(self.catalog_ttl);

        if let Some(key) = self.openai_key {
            let client = Arc::new(OpenAiClient::with_http_client(
                key,
                self.openai_base_url,
                http.clone(),
            ));
            registry.register(client.clone());
            catalog.register_source(client);
        }

        if let Some(key) = self.anthropic_key {
            let client = Arc::new(ClaudeClient::with_http_client(
                key,
                self.anthropic_base_url,
                http.clone(),
            ));
            registry.register(client.clone());
            catalog.register_source(client);
        }

        if let Some(key) = self.gemini_key {
            let primary = GeminiClient::with_http_client(key, self.gemini_base_url, http.clone());
            let legacy = primary.clone().with_api(GeminiApi::Legacy);
            registry.register(Arc::new(TieredExecutor::new(
                Arc::new(primary.clone()),
                Arc::new(legacy),
            )));
            catalog.register_source(Arc::new(primary));
        }

        for executor in self.executors {
            registry.register(executor);
        }
        for source in self.discovery {
            catalog.register_source(source);
        }

        let registry = Arc::new(registry);
        let catalog = Arc::new(catalog);
        let health = HealthProbe::new(registry.clone(), catalog.clone(), &self.health);
        let cache = self.response_cache.as_ref().map(ResponseCache::new);

        Ok(Orchestrator::new(
            registry,
            catalog,
            cache,
            health,
            self.marketing_route,
        ))
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
