//! The orchestrator service.
//!
//! # Request flow
//!
//! ```text
//! complete(request)
//!     │ validate
//!     ▼
//! select route ── explicit provider unconfigured ──► success=false
//!     │           (marketing → tier → explicit/catalog → default)
//!     ▼
//! response cache ── hit ──► cached=true
//!     │ miss
//!     ▼
//! ExecutorRegistry::execute(route)
//!     │ error
//!     ▼
//! fallback chain (skip failed pair, skip unconfigured)
//!     │ all failed
//!     ▼
//! apology response
//! ```
//!
//! `complete()` never returns an error: every failure path ends in a
//! [`CompletionResponse`] with `success=false` and warnings.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tracing::{debug, info, instrument, warn};

use super::builder::OrchestratorBuilder;
use super::routing::{self, Route};
use super::stats::{Counters, OrchestratorStats};
use crate::cache::{CacheKey, ResponseCache};
use crate::catalog::ModelCatalog;
use crate::health::{HealthProbe, HealthReport};
use crate::marketing::is_marketing_content;
use crate::providers::{Completion, ExecutionOptions, ExecutorRegistry};
use crate::telemetry;
use crate::types::{
    CompletionRequest, CompletionResponse, Message, NormalizedModel, Provider, ProviderChoice,
    StreamEvent,
};
use crate::{OrchestratorError, Result};

/// Single entry point for AI text generation.
///
/// Constructed once (via [`Orchestrator::builder()`]) and shared, e.g. in an
/// `Arc` or as axum state.
pub struct Orchestrator {
    registry: Arc<ExecutorRegistry>,
    catalog: Arc<ModelCatalog>,
    cache: Option<ResponseCache>,
    health: HealthProbe,
    marketing_route: Option<Route>,
    counters: Counters,
}

/// How a route was chosen.
#[derive(Debug)]
struct Selection {
    route: Route,
    warnings: Vec<String>,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    pub(crate) fn new(
        registry: Arc<ExecutorRegistry>,
        catalog: Arc<ModelCatalog>,
        cache: Option<ResponseCache>,
        health: HealthProbe,
        marketing_route: Option<Route>,
    ) -> Self {
        Self {
            registry,
            catalog,
            cache,
            health,
            marketing_route,
            counters: Counters::default(),
        }
    }

    /// Providers with a registered executor.
    pub fn configured_providers(&self) -> Vec<Provider> {
        self.registry.providers()
    }

    pub fn is_configured(&self, provider: Provider) -> bool {
        self.registry.is_configured(provider)
    }

    /// Run a completion, falling back across providers on failure.
    #[instrument(
        name = "orchestrator.complete",
        skip(self, request),
        fields(provider = tracing::field::Empty, model = tracing::field::Empty)
    )]
    pub async fn complete(&self, request: CompletionRequest) -> CompletionResponse {
        self.counters.request();

        if let Err(e) = request.validate() {
            warn!(error = %e, "rejecting invalid request");
            return CompletionResponse::failure(e.to_string());
        }

        let Selection { route, mut warnings } = match self.select(&request).await {
            Ok(selection) => selection,
            Err(e) => {
                self.counters.config_failure();
                warn!(error = %e, "no usable provider for request");
                return CompletionResponse::failure(e.to_string());
            }
        };
        let span = tracing::Span::current();
        span.record("provider", route.provider.as_str());
        span.record("model", route.model.as_str());

        let key = CacheKey {
            messages: &request.messages,
            provider: route.provider,
            model: &route.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            parameters: request.parameters.as_ref(),
        };
        let cache = self.cache.as_ref().filter(|_| !request.stream);
        if let Some(cache) = cache
            && let Some(hit) = cache.get(&key).await
        {
            debug!("serving cached response");
            self.counters.cache_hit();
            return hit;
        }

        let options = ExecutionOptions::from(&request);
        match self
            .registry
            .execute(route.provider, &request.messages, &route.model, &options)
            .await
        {
            Ok(completion) => {
                let response = build_response(route.provider, completion, warnings);
                if let Some(cache) = cache {
                    cache.insert(&key, response.clone()).await;
                }
                response
            }
            Err(e) => {
                warnings.push(format!("{route} failed: {e}"));
                self.fallback(&request.messages, &route, &e, warnings, &options)
                    .await
            }
        }
    }

    /// Emulated streaming: one `Content` event with the whole text, then `Done`.
    pub async fn stream(&self, request: CompletionRequest) -> BoxStream<'static, StreamEvent> {
        let response = self.complete(request.stream(true)).await;
        let mut events = Vec::with_capacity(2);
        if !response.content.is_empty() {
            events.push(StreamEvent::Content {
                content: response.content.clone(),
            });
        }
        events.push(StreamEvent::Done(response.into()));
        futures_util::stream::iter(events).boxed()
    }

    /// Catalog contents for one provider or all of them.
    pub async fn list_models(
        &self,
        provider: Option<Provider>,
    ) -> BTreeMap<Provider, Vec<NormalizedModel>> {
        match provider {
            Some(provider) => {
                BTreeMap::from([(provider, self.catalog.get_models(provider, false).await)])
            }
            None => self.catalog.list_all(false).await,
        }
    }

    /// Force re-discovery for every provider.
    pub async fn refresh_models(&self) -> BTreeMap<Provider, Vec<NormalizedModel>> {
        info!("refreshing model catalog");
        self.catalog.refresh_all().await
    }

    /// Empty the response cache.
    pub async fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear().await;
        }
    }

    pub async fn stats(&self) -> OrchestratorStats {
        let entries = match &self.cache {
            Some(cache) => cache.len().await,
            None => 0,
        };
        self.counters.snapshot(entries, self.configured_providers())
    }

    /// Provider liveness, cached for a few minutes unless `force`.
    pub async fn health(&self, force: bool) -> HealthReport {
        self.health.check(force).await
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    // ========================================================================
    // Selection
    // ========================================================================

    async fn select(&self, request: &CompletionRequest) -> Result<Selection> {
        let mut warnings = Vec::new();

        if let ProviderChoice::Explicit(provider) = request.provider
            && !self.registry.is_configured(provider)
        {
            return Err(OrchestratorError::NotConfigured(provider));
        }

        if let Some(route) = &self.marketing_route
            && self.registry.is_configured(route.provider)
            && is_marketing_content(&request.messages)
        {
            let requested = match (request.provider.explicit(), &request.model) {
                (Some(p), Some(m)) => Some(format!("{p}/{m}")),
                (Some(p), None) => Some(p.to_string()),
                (None, Some(m)) => Some(m.clone()),
                (None, None) => None,
            };
            if let Some(requested) = requested.filter(|r| *r != route.to_string()) {
                warnings.push(format!(
                    "marketing content routed to {route} instead of requested {requested}"
                ));
            }
            debug!(route = %route, "marketing content detected");
            return Ok(Selection {
                route: route.clone(),
                warnings,
            });
        }

        let route = match request.provider {
            ProviderChoice::Explicit(provider) => {
                let model = match &request.model {
                    Some(model) => model.clone(),
                    None => match self.catalog.top_model(provider).await {
                        Some(top) => top.id,
                        None => routing::default_model(provider).to_string(),
                    },
                };
                Route::new(provider, model)
            }
            ProviderChoice::Auto => self.auto_route(request, &mut warnings)?,
        };

        Ok(Selection { route, warnings })
    }

    fn auto_route(&self, request: &CompletionRequest, warnings: &mut Vec<String>) -> Result<Route> {
        if let Some(model) = &request.model
            && let Some(provider) = routing::provider_for_model(model)
            && self.registry.is_configured(provider)
        {
            return Ok(Route::new(provider, model.clone()));
        }

        let preferred = routing::tier_route(request.model_tier);
        if self.registry.is_configured(preferred.provider) {
            return Ok(preferred);
        }

        let substitute = routing::FALLBACK_CHAIN
            .iter()
            .find(|(provider, _)| self.registry.is_configured(*provider))
            .map(|(provider, model)| Route::new(*provider, *model))
            .ok_or(OrchestratorError::NoProvider)?;
        warnings.push(format!(
            "{} is not configured; using {substitute}",
            preferred.provider
        ));
        Ok(substitute)
    }

    // ========================================================================
    // Fallback
    // ========================================================================

    async fn fallback(
        &self,
        messages: &[Message],
        failed: &Route,
        original: &OrchestratorError,
        mut warnings: Vec<String>,
        options: &ExecutionOptions,
    ) -> CompletionResponse {
        self.counters.fallback();
        warn!(route = %failed, error = %original, "selected route failed, walking fallback chain");

        for route in routing::fallback_routes(failed) {
            if !self.registry.is_configured(route.provider) {
                continue;
            }
            metrics::counter!(telemetry::FALLBACKS_TOTAL,
                "from" => failed.provider.as_str(),
                "to" => route.provider.as_str(),
            )
            .increment(1);
            match self
                .registry
                .execute(route.provider, messages, &route.model, options)
                .await
            {
                Ok(completion) => {
                    info!(route = %route, "fallback succeeded");
                    warnings.push(format!("served by fallback {route} after {failed} failed"));
                    return build_response(route.provider, completion, warnings);
                }
                Err(e) => {
                    warn!(route = %route, error = %e, "fallback failed");
                    warnings.push(format!("fallback {route} failed: {e}"));
                }
            }
        }

        self.counters.apology();
        warnings.push(original.to_string());
        CompletionResponse::apology(&original.to_string(), warnings)
    }
}

fn build_response(
    provider: Provider,
    completion: Completion,
    mut warnings: Vec<String>,
) -> CompletionResponse {
    warnings.extend(completion.warnings);
    CompletionResponse {
        success: true,
        content: completion.text,
        provider: provider.as_str().to_string(),
        model: completion.model,
        usage: completion.usage,
        warnings,
        cached: false,
        error: None,
    }
}
