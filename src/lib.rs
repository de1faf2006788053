//! EmailPilot AI - provider orchestration for text generation
//!
//! This crate routes completion requests across OpenAI, Anthropic Claude
//! and Google Gemini behind one [`Orchestrator`]: it picks a provider and
//! model per request, clamps sampling settings to what each vendor accepts,
//! caches repeat requests, and degrades gracefully through a fixed fallback
//! chain. A model catalog and a health probe report what each vendor
//! currently serves.
//!
//! # Example
//!
//! ```rust,no_run
//! use emailpilot_ai::{CompletionRequest, Message, ModelTier, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> emailpilot_ai::Result<()> {
//!     let orchestrator = Orchestrator::builder()
//!         .openai("sk-your-key")
//!         .anthropic("sk-ant-your-key")
//!         .gemini("your-gemini-key")
//!         .build()?;
//!
//!     let response = orchestrator
//!         .complete(
//!             CompletionRequest::new(vec![
//!                 Message::system("You are a concise assistant."),
//!                 Message::user("Summarise the plot of Hamlet in two sentences."),
//!             ])
//!             .model_tier(ModelTier::Flagship),
//!         )
//!         .await;
//!
//!     println!("{} ({}/{})", response.content, response.provider, response.model);
//!     Ok(())
//! }
//! ```
//!
//! `complete()` never fails: configuration problems come back as
//! `success=false` responses, and exhausted fallbacks as an apology with the
//! original error in `warnings`.

pub mod cache;
pub mod catalog;
pub mod error;
pub mod health;
pub mod marketing;
pub mod orchestrator;
pub mod providers;
#[cfg(feature = "server")]
pub mod server;
pub mod telemetry;
pub mod types;

/// Crate version, as reported by the daemon.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export main types at crate root
pub use cache::CacheConfig;
pub use catalog::ModelCatalog;
pub use error::{OrchestratorError, Result};
pub use health::{HealthConfig, HealthReport, OverallStatus, ProviderHealth, ProviderStatus};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, OrchestratorStats, Route};
pub use providers::{
    Completion, ExecutionOptions, ModelDiscovery, ProviderExecutor, RetryConfig,
};

pub use types::{
    CompletionRequest, CompletionResponse, Message, ModelCapability, ModelTier, NormalizedModel,
    Provider, ProviderChoice, Role, StreamEvent, StreamSummary, Usage,
};
