//! Retry configuration, delay calculation, and the executor decorator.
//!
//! [`RetryConfig`] controls retry behaviour; [`RetryingExecutor`] wraps a
//! [`ProviderExecutor`] and retries transient errors through the shared
//! [`with_retry()`] helper.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::traits::{Completion, ExecutionOptions, ProviderExecutor};
use crate::telemetry;
use crate::types::{Message, Provider};
use crate::{OrchestratorError, Result};

/// Configuration for retry behaviour on transient errors.
///
/// Uses exponential backoff and honours `retry-after` hints:
///
/// ```rust
/// # use emailpilot_ai::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(4)
///     .initial_delay(Duration::from_millis(200));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 3.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: 500ms.
    pub initial_delay: Duration,
    /// Maximum delay between retries. Default: 30s.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A config that makes a single attempt.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Backoff for a 0-indexed attempt: `initial_delay * 2^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }

    /// Backoff for an attempt, with a provider `retry_after` hint taking precedence.
    pub fn effective_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        retry_after
            .map(|hint| hint.min(self.max_delay))
            .unwrap_or_else(|| self.delay_for_attempt(attempt))
    }
}

/// Execute an async operation with retry logic.
///
/// Retries errors classified transient by
/// [`OrchestratorError::is_transient()`]; permanent errors return at once.
pub(crate) async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    provider_name: &str,
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt in 0..config.max_attempts.max(1) {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() => {
                if attempt + 1 < config.max_attempts {
                    metrics::counter!(telemetry::RETRIES_TOTAL,
                        "provider" => provider_name.to_owned(),
                    )
                    .increment(1);
                    let delay = config.effective_delay(attempt, e.retry_after());
                    warn!(
                        provider = provider_name,
                        attempt = attempt + 1,
                        max_attempts = config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or(OrchestratorError::NoProvider))
}

/// Decorator that retries a [`ProviderExecutor`] on transient errors.
pub struct RetryingExecutor {
    inner: Arc<dyn ProviderExecutor>,
    config: RetryConfig,
}

impl RetryingExecutor {
    pub fn new(inner: Arc<dyn ProviderExecutor>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl ProviderExecutor for RetryingExecutor {
    fn provider(&self) -> Provider {
        self.inner.provider()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        messages: &[Message],
        model: &str,
        options: &ExecutionOptions,
    ) -> Result<Completion> {
        with_retry(&self.config, self.inner.name(), || {
            self.inner.complete(messages, model, options)
        })
        .await
    }
}
