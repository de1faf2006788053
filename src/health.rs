//! Provider health probe.
//!
//! Sends a one-token completion to each configured provider, caches each
//! result for a few minutes, and folds the results into an overall status.
//! Probe results are cached independently of the model catalog and the
//! response cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use moka::future::Cache;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::OrchestratorError;
use crate::catalog::ModelCatalog;
use crate::providers::{ExecutionOptions, ExecutorRegistry};
use crate::telemetry;
use crate::types::{Message, Provider};

/// Default lifetime of a cached probe result: 5 minutes.
pub const DEFAULT_HEALTH_TTL: Duration = Duration::from_secs(5 * 60);

/// Default per-probe timeout: 5 seconds.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Health probe settings.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthConfig {
    pub ttl: Duration,
    pub timeout: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_HEALTH_TTL,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl HealthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Healthy,
    Unhealthy,
    NotConfigured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Result of probing one provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderHealth {
    pub provider: Provider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub status: ProviderStatus,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl ProviderHealth {
    fn not_configured(provider: Provider) -> Self {
        Self {
            provider,
            model: None,
            status: ProviderStatus::NotConfigured,
            healthy: false,
            latency_ms: None,
            error: Some(OrchestratorError::NotConfigured(provider).to_string()),
            checked_at: Utc::now(),
        }
    }
}

/// A model offered by a healthy provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthyModel {
    pub provider: Provider,
    pub id: String,
    pub label: String,
}

/// Aggregated health across providers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: OverallStatus,
    pub providers: Vec<ProviderHealth>,
    pub healthy_models: Vec<HealthyModel>,
    pub checked_at: DateTime<Utc>,
}

/// Cheap model used to probe each provider.
pub fn probe_model(provider: Provider) -> &'static str {
    match provider {
        Provider::OpenAi => "gpt-4o-mini",
        Provider::Claude => "claude-3-5-haiku-20241022",
        Provider::Gemini => "gemini-1.5-flash",
    }
}

/// Fold per-provider results into an overall status.
///
/// Unconfigured providers are ignored; with none configured the system is
/// unhealthy.
pub fn aggregate(results: &[ProviderHealth]) -> OverallStatus {
    let configured: Vec<_> = results
        .iter()
        .filter(|r| r.status != ProviderStatus::NotConfigured)
        .collect();
    let healthy = configured.iter().filter(|r| r.healthy).count();
    match healthy {
        0 => OverallStatus::Unhealthy,
        n if n == configured.len() => OverallStatus::Healthy,
        _ => OverallStatus::Degraded,
    }
}

/// Cached liveness checks over the executor registry.
pub struct HealthProbe {
    registry: Arc<ExecutorRegistry>,
    catalog: Arc<ModelCatalog>,
    cache: Cache<Provider, ProviderHealth>,
    timeout: Duration,
}

impl HealthProbe {
    pub fn new(
        registry: Arc<ExecutorRegistry>,
        catalog: Arc<ModelCatalog>,
        config: &HealthConfig,
    ) -> Self {
        Self {
            registry,
            catalog,
            cache: Cache::builder().time_to_live(config.ttl).build(),
            timeout: config.timeout,
        }
    }

    /// Probe every provider (cached unless `force`) and aggregate.
    #[instrument(name = "health.check", skip(self))]
    pub async fn check(&self, force: bool) -> HealthReport {
        let providers = join_all(Provider::ALL.map(|p| self.check_provider(p, force))).await;

        let mut healthy_models = Vec::new();
        for result in providers.iter().filter(|r| r.healthy) {
            for model in self.catalog.get_models(result.provider, false).await {
                if !model.deprecated {
                    healthy_models.push(HealthyModel {
                        provider: model.provider,
                        id: model.id,
                        label: model.label,
                    });
                }
            }
        }

        HealthReport {
            status: aggregate(&providers),
            providers,
            healthy_models,
            checked_at: Utc::now(),
        }
    }

    /// Probe one provider, serving a cached result unless `force`.
    pub async fn check_provider(&self, provider: Provider, force: bool) -> ProviderHealth {
        if !self.registry.is_configured(provider) {
            return ProviderHealth::not_configured(provider);
        }
        if !force && let Some(cached) = self.cache.get(&provider).await {
            return cached;
        }
        let result = self.probe(provider).await;
        self.cache.insert(provider, result.clone()).await;
        result
    }

    async fn probe(&self, provider: Provider) -> ProviderHealth {
        let model = probe_model(provider);
        let Some(executor) = self.registry.get(provider) else {
            return ProviderHealth::not_configured(provider);
        };

        let messages = [Message::user("ping")];
        let options = ExecutionOptions::new(0.0, 1);
        let start = Instant::now();
        let probe = executor.complete(&messages, model, &options);
        let outcome = tokio::time::timeout(self.timeout, probe)
            .await
            .unwrap_or(Err(OrchestratorError::Timeout(self.timeout)));
        let latency_ms = start.elapsed().as_millis() as u64;

        // a reachable API that produced no text for a one-token budget is alive
        let error = match outcome {
            Ok(_) | Err(OrchestratorError::EmptyResponse) => None,
            Err(e) => Some(e.to_string()),
        };
        let healthy = error.is_none();
        metrics::counter!(telemetry::HEALTH_PROBES_TOTAL,
            "provider" => provider.as_str(),
            "status" => if healthy { "ok" } else { "error" },
        )
        .increment(1);
        match &error {
            None => debug!(provider = %provider, latency_ms, "health probe ok"),
            Some(e) => warn!(provider = %provider, error = %e, "health probe failed"),
        }

        ProviderHealth {
            provider,
            model: Some(model.to_string()),
            status: if healthy {
                ProviderStatus::Healthy
            } else {
                ProviderStatus::Unhealthy
            },
            healthy,
            latency_ms: Some(latency_ms),
            error,
            checked_at: Utc::now(),
        }
    }
}
