//! Model catalog.
//!
//! Discovers, ranks and caches the models each provider serves. Entries are
//! snapshots replaced wholesale on refresh; a provider's entry is either
//! absent, younger than the TTL, or was just force-refreshed.
//!
//! Discovery never fails from the caller's point of view: on error the
//! previous snapshot (if any) is served, otherwise the static known-good
//! list from [`ranking`].

pub mod ranking;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::providers::ModelDiscovery;
use crate::telemetry;
use crate::types::{NormalizedModel, Provider};

pub use ranking::{preference_table, static_models};

/// Default catalog TTL: 6 hours.
pub const DEFAULT_CATALOG_TTL: Duration = Duration::from_secs(6 * 60 * 60);

struct CatalogEntry {
    models: Vec<NormalizedModel>,
    fetched_at: Instant,
}

/// Per-provider model catalog with TTL-based caching.
pub struct ModelCatalog {
    sources: HashMap<Provider, Arc<dyn ModelDiscovery>>,
    ttl: Duration,
    // one lock for all providers: concurrent callers never run duplicate discovery
    entries: Mutex<HashMap<Provider, CatalogEntry>>,
}

impl ModelCatalog {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sources: HashMap::new(),
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Register (or replace) the discovery source for its provider.
    pub fn register_source(&mut self, source: Arc<dyn ModelDiscovery>) {
        self.sources.insert(source.provider(), source);
    }

    pub fn with_source(mut self, source: Arc<dyn ModelDiscovery>) -> Self {
        self.register_source(source);
        self
    }

    /// Models for `provider`, best first.
    ///
    /// Served from cache while younger than the TTL unless `force_refresh`.
    #[instrument(name = "catalog.get_models", skip(self), fields(provider = %provider))]
    pub async fn get_models(
        &self,
        provider: Provider,
        force_refresh: bool,
    ) -> Vec<NormalizedModel> {
        let mut entries = self.entries.lock().await;

        if !force_refresh
            && let Some(entry) = entries.get(&provider)
            && entry.fetched_at.elapsed() < self.ttl
        {
            return entry.models.clone();
        }

        let Some(source) = self.sources.get(&provider) else {
            debug!("no discovery source, serving static list");
            let models = static_models(provider);
            entries.insert(
                provider,
                CatalogEntry {
                    models: models.clone(),
                    fetched_at: Instant::now(),
                },
            );
            return models;
        };

        match source.discover().await {
            Ok(found) => {
                metrics::counter!(telemetry::DISCOVERY_TOTAL,
                    "provider" => provider.as_str(),
                    "status" => "ok",
                )
                .increment(1);
                let mut models = ranking::rank(provider, found);
                if models.is_empty() {
                    warn!("discovery returned no usable models, serving static list");
                    models = static_models(provider);
                }
                info!(count = models.len(), "model discovery complete");
                entries.insert(
                    provider,
                    CatalogEntry {
                        models: models.clone(),
                        fetched_at: Instant::now(),
                    },
                );
                models
            }
            Err(e) => {
                metrics::counter!(telemetry::DISCOVERY_TOTAL,
                    "provider" => provider.as_str(),
                    "status" => "error",
                )
                .increment(1);
                match entries.get(&provider) {
                    Some(previous) => {
                        warn!(error = %e, "model discovery failed, serving previous snapshot");
                        previous.models.clone()
                    }
                    None => {
                        warn!(error = %e, "model discovery failed, serving static list");
                        static_models(provider)
                    }
                }
            }
        }
    }

    /// Best non-deprecated model for `provider`.
    pub async fn top_model(&self, provider: Provider) -> Option<NormalizedModel> {
        self.get_models(provider, false)
            .await
            .into_iter()
            .find(|m| !m.deprecated)
    }

    /// Models for every provider.
    pub async fn list_all(&self, force_refresh: bool) -> BTreeMap<Provider, Vec<NormalizedModel>> {
        let mut all = BTreeMap::new();
        for provider in Provider::ALL {
            all.insert(provider, self.get_models(provider, force_refresh).await);
        }
        all
    }

    /// Force re-discovery for all providers and return the new snapshot.
    pub async fn refresh_all(&self) -> BTreeMap<Provider, Vec<NormalizedModel>> {
        self.list_all(true).await
    }

    /// Drop a provider's snapshot so the next call re-discovers.
    pub async fn invalidate(&self, provider: Provider) {
        self.entries.lock().await.remove(&provider);
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_CATALOG_TTL)
    }
}
