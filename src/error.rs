//! Orchestrator error types

use std::time::Duration;

use crate::types::Provider;

/// Orchestrator error types
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    // Provider/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("authentication failed")]
    AuthenticationFailed,

    /// The vendor reported the model as unknown (HTTP 404 / `not_found_error`).
    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    /// No executor is registered for the provider (missing API key).
    #[error("{0} provider not configured: missing API key")]
    NotConfigured(Provider),

    #[error("no provider configured")]
    NoProvider,

    #[error("configuration error: {0}")]
    Configuration(String),

    // Soft errors
    #[error("empty response from model")]
    EmptyResponse,

    #[error("content filtered: {reason}")]
    ContentFiltered { reason: String },
}

impl OrchestratorError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::RateLimited { .. } | Self::Timeout(_) | Self::EmptyResponse => {
                true
            }
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Provider-supplied retry hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Whether the vendor reported the model itself as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ModelNotFound(_))
    }
}

impl From<reqwest::Error> for OrchestratorError {
    fn from(err: reqwest::Error) -> Self {
        OrchestratorError::Http(err.to_string())
    }
}

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;
