//! Executor registry.
//!
//! The `ExecutorRegistry` maps each [`Provider`] to the executor that serves
//! it. A provider is *configured* exactly when an executor is registered for
//! it, which in practice means its API key was supplied.
//!
//! # Retry Wrapping
//!
//! When a [`RetryConfig`] is set, executors registered afterwards are
//! wrapped in a [`RetryingExecutor`], so each vendor retries internally
//! before the orchestrator sees a failure and walks its fallback chain.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{instrument, warn};

use super::retry::{RetryConfig, RetryingExecutor};
use super::traits::{Completion, ExecutionOptions, ProviderExecutor};
use crate::telemetry;
use crate::types::{Message, Provider, Usage};
use crate::{OrchestratorError, Result};

/// Registry of executors keyed by provider.
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: HashMap<Provider, Arc<dyn ProviderExecutor>>,
    retry_config: Option<RetryConfig>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retry configuration for executors registered after this call.
    pub fn set_retry_config(&mut self, config: RetryConfig) {
        self.retry_config = Some(config);
    }

    /// Register (or replace) the executor for its provider.
    pub fn register(&mut self, executor: Arc<dyn ProviderExecutor>) {
        let provider = executor.provider();
        let executor = match &self.retry_config {
            Some(config) if config.max_attempts > 1 => {
                let retrying = RetryingExecutor::new(executor, config.clone());
                Arc::new(retrying) as Arc<dyn ProviderExecutor>
            }
            _ => executor,
        };
        self.executors.insert(provider, executor);
    }

    pub fn get(&self, provider: Provider) -> Option<Arc<dyn ProviderExecutor>> {
        self.executors.get(&provider).cloned()
    }

    pub fn is_configured(&self, provider: Provider) -> bool {
        self.executors.contains_key(&provider)
    }

    /// Configured providers in canonical order.
    pub fn providers(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| self.is_configured(*p))
            .collect()
    }

    /// Run one completion on `provider`, recording request metrics.
    #[instrument(
        name = "registry.execute",
        skip(self, messages, options),
        fields(provider = %provider, model = %model)
    )]
    pub async fn execute(
        &self,
        provider: Provider,
        messages: &[Message],
        model: &str,
        options: &ExecutionOptions,
    ) -> Result<Completion> {
        let start = Instant::now();
        let Some(executor) = self.get(provider) else {
            Self::record_request(provider, start, false);
            return Err(OrchestratorError::NotConfigured(provider));
        };

        let result = executor.complete(messages, model, options).await;
        Self::record_request(provider, start, result.is_ok());
        match &result {
            Ok(completion) => Self::record_token_usage(provider, &completion.usage),
            Err(e) => warn!(error = %e, "executor failed"),
        }
        result
    }

    fn record_request(provider: Provider, start: Instant, ok: bool) {
        let status = if ok { "ok" } else { "error" };
        metrics::counter!(telemetry::REQUESTS_TOTAL,
            "provider" => provider.as_str(),
            "status" => status,
        )
        .increment(1);
        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS,
            "provider" => provider.as_str(),
        )
        .record(start.elapsed().as_secs_f64());
    }

    fn record_token_usage(provider: Provider, usage: &Usage) {
        metrics::counter!(telemetry::TOKENS_TOTAL,
            "provider" => provider.as_str(),
            "direction" => "input",
        )
        .increment(u64::from(usage.input_tokens));
        metrics::counter!(telemetry::TOKENS_TOTAL,
            "provider" => provider.as_str(),
            "direction" => "output",
        )
        .increment(u64::from(usage.output_tokens));
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("providers", &self.providers())
            .field("retry_config", &self.retry_config)
            .finish()
    }
}
