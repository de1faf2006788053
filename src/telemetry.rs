//! Telemetry metric name constants.
//!
//! Centralised metric names for orchestrator operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `emailpilot_ai_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `provider` — provider name ("openai", "claude", "gemini")
//! - `status` — outcome: "ok" or "error"
//! - `direction` — token direction: "input" or "output"

/// Total executor calls dispatched through the registry.
///
/// Labels: `provider`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "emailpilot_ai_requests_total";

/// Executor call duration in seconds.
///
/// Labels: `provider`.
pub const REQUEST_DURATION_SECONDS: &str = "emailpilot_ai_request_duration_seconds";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `provider`.
pub const RETRIES_TOTAL: &str = "emailpilot_ai_retries_total";

/// Total fallback-chain attempts after a primary failure.
///
/// Labels: `from` (failed provider), `to` (provider tried next).
pub const FALLBACKS_TOTAL: &str = "emailpilot_ai_fallbacks_total";

/// Total tokens consumed.
///
/// Labels: `provider`, `direction` ("input" | "output").
pub const TOKENS_TOTAL: &str = "emailpilot_ai_tokens_total";

/// Total response cache hits.
///
/// Labels: `provider`.
pub const CACHE_HITS_TOTAL: &str = "emailpilot_ai_cache_hits_total";

/// Total response cache misses.
///
/// Labels: `provider`.
pub const CACHE_MISSES_TOTAL: &str = "emailpilot_ai_cache_misses_total";

/// Total model discovery passes.
///
/// Labels: `provider`, `status`.
pub const DISCOVERY_TOTAL: &str = "emailpilot_ai_discovery_total";

/// Total health probe calls that reached a provider.
///
/// Labels: `provider`, `status`.
pub const HEALTH_PROBES_TOTAL: &str = "emailpilot_ai_health_probes_total";
