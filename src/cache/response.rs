//! Completion response cache.
//!
//! [`ResponseCache`] memoizes successful non-streaming completions so an
//! identical request is answered without calling a vendor again. Entries are
//! keyed on a content hash of the resolved request (messages, provider,
//! model, temperature, max_tokens, extra parameters) and evicted by LRU
//! size bound and TTL.
//!
//! # Architecture
//!
//! The cache sits in the [`Orchestrator`](crate::Orchestrator), after
//! provider/model selection and before the
//! [`ExecutorRegistry`](crate::providers::ExecutorRegistry). A hit bypasses
//! execution, retries and fallback entirely. Only responses produced by the
//! primary route are stored; fallback and apology responses never are.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use moka::future::Cache;
use serde_json::{Map, Value};

use crate::telemetry;
use crate::types::{CompletionResponse, Message, Provider};

/// Configuration for the response cache.
///
/// ```rust
/// # use emailpilot_ai::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(500)
///     .ttl(Duration::from_secs(600));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of cached responses. Default: 1,000.
    pub max_entries: u64,
    /// Time-to-live for cached responses. Default: 1 hour.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// The resolved request fields that identify a cacheable completion.
#[derive(Debug, Clone, Copy)]
pub struct CacheKey<'a> {
    pub messages: &'a [Message],
    pub provider: Provider,
    pub model: &'a str,
    pub temperature: f64,
    pub max_tokens: u32,
    pub parameters: Option<&'a Map<String, Value>>,
}

impl CacheKey<'_> {
    /// Deterministic content hash of the key fields.
    pub fn digest(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.messages.hash(&mut hasher);
        self.provider.hash(&mut hasher);
        self.model.hash(&mut hasher);
        self.temperature.to_bits().hash(&mut hasher);
        self.max_tokens.hash(&mut hasher);
        // serde_json::Map is ordered, so the serialized form is stable
        if let Some(parameters) = self.parameters.filter(|p| !p.is_empty()) {
            Value::Object(parameters.clone()).to_string().hash(&mut hasher);
        }
        hasher.finish()
    }
}

/// In-memory LRU + TTL cache of completion responses.
pub struct ResponseCache {
    cache: Cache<u64, CompletionResponse>,
}

impl ResponseCache {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();
        Self { cache }
    }

    /// Look up a response; a hit comes back flagged `cached`.
    ///
    /// Emits cache hit/miss metrics.
    pub async fn get(&self, key: &CacheKey<'_>) -> Option<CompletionResponse> {
        let provider = key.provider.as_str();
        match self.cache.get(&key.digest()).await {
            Some(response) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "provider" => provider).increment(1);
                Some(response.as_cached())
            }
            None => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "provider" => provider)
                    .increment(1);
                None
            }
        }
    }

    pub async fn insert(&self, key: &CacheKey<'_>, response: CompletionResponse) {
        self.cache.insert(key.digest(), response).await;
    }

    /// Evict every entry.
    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    /// Number of live entries.
    pub async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
