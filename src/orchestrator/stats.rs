//! Orchestrator counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::types::Provider;

/// Snapshot returned by [`Orchestrator::stats()`](crate::Orchestrator::stats).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrchestratorStats {
    pub requests: u64,
    pub cache_hits: u64,
    pub fallbacks: u64,
    pub apologies: u64,
    pub config_failures: u64,
    pub cache_entries: u64,
    pub configured_providers: Vec<Provider>,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    requests: AtomicU64,
    cache_hits: AtomicU64,
    fallbacks: AtomicU64,
    apologies: AtomicU64,
    config_failures: AtomicU64,
}

impl Counters {
    pub fn request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn apology(&self) {
        self.apologies.fetch_add(1, Ordering::Relaxed);
    }

    pub fn config_failure(&self) {
        self.config_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(
        &self,
        cache_entries: u64,
        configured_providers: Vec<Provider>,
    ) -> OrchestratorStats {
        OrchestratorStats {
            requests: self.requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            apologies: self.apologies.load(Ordering::Relaxed),
            config_failures: self.config_failures.load(Ordering::Relaxed),
            cache_entries,
            configured_providers,
        }
    }
}
