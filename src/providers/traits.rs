//! Provider traits.
//!
//! Each vendor is reached through a [`ProviderExecutor`], which turns a
//! normalized `(messages, model, temperature, max_tokens)` call into one
//! vendor API request and normalizes the result. Vendors that can list
//! their models also implement [`ModelDiscovery`], which the
//! [`ModelCatalog`](crate::catalog::ModelCatalog) consumes.
//!
//! Executors are registered per [`Provider`] in the
//! [`ExecutorRegistry`](super::ExecutorRegistry), so adding a vendor never
//! touches orchestrator logic. Decorators ([`RetryingExecutor`](super::RetryingExecutor),
//! [`TieredExecutor`](super::TieredExecutor)) implement the same trait.
//!
//! # Example
//!
//! ```ignore
//! async fn complete(
//!     &self,
//!     messages: &[Message],
//!     model: &str,
//!     options: &ExecutionOptions,
//! ) -> Result<Completion> {
//!     let prepared = params::prepare(self.provider(), model, options);
//!     // ... call the vendor with prepared.temperature / prepared.max_tokens
//! }
//! ```

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::Result;
use crate::types::{CompletionRequest, Message, NormalizedModel, Provider, Usage};

/// Sampling settings handed to an executor.
///
/// Values are as requested by the caller; executors clamp and filter them.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOptions {
    pub temperature: f64,
    pub max_tokens: u32,
    pub parameters: Map<String, Value>,
}

impl ExecutionOptions {
    pub fn new(temperature: f64, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
            parameters: Map::new(),
        }
    }

    pub fn parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }
}

impl From<&CompletionRequest> for ExecutionOptions {
    fn from(request: &CompletionRequest) -> Self {
        Self {
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            parameters: request.parameters.clone().unwrap_or_default(),
        }
    }
}

/// Normalized result of one executor call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Usage,
    /// Model that actually produced the text (may differ from the requested one).
    pub model: String,
    /// Adjustments made along the way (clamping, dropped parameters, model substitution).
    pub warnings: Vec<String>,
    pub finish_reason: Option<String>,
}

// ============================================================================
// Provider Executor
// ============================================================================

/// Executes completions against one vendor.
#[async_trait]
pub trait ProviderExecutor: Send + Sync {
    /// Vendor this executor talks to.
    fn provider(&self) -> Provider;

    /// Executor name for logging/debugging.
    fn name(&self) -> &str {
        self.provider().as_str()
    }

    /// Run one completion.
    ///
    /// Clamps temperature and `max_tokens`, drops unsupported parameters
    /// (recording warnings), and returns an error on final failure.
    async fn complete(
        &self,
        messages: &[Message],
        model: &str,
        options: &ExecutionOptions,
    ) -> Result<Completion>;
}

// ============================================================================
// Model Discovery
// ============================================================================

/// Lists the models a vendor currently serves.
///
/// Returned models are unranked; the catalog assigns ranks.
#[async_trait]
pub trait ModelDiscovery: Send + Sync {
    fn provider(&self) -> Provider;

    async fn discover(&self) -> Result<Vec<NormalizedModel>>;
}
