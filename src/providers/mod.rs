//! Vendor executors and the machinery around them.
//!
//! Each vendor client implements [`ProviderExecutor`] (and, where the vendor
//! supports it, [`ModelDiscovery`]). The [`ExecutorRegistry`] holds one
//! executor per configured provider; decorators add retries and the
//! primary/legacy split used for Gemini.

mod claude;
mod gemini;
pub(crate) mod http;
mod openai;
pub mod params;
mod registry;
mod retry;
mod tiered;
mod traits;
pub mod usage;

pub use claude::ClaudeClient;
pub use gemini::{GeminiApi, GeminiClient, MARKETING_SAFE_MODELS};
pub use openai::OpenAiClient;
pub use registry::ExecutorRegistry;
pub use retry::{RetryConfig, RetryingExecutor};
pub use tiered::TieredExecutor;
pub use traits::{Completion, ExecutionOptions, ModelDiscovery, ProviderExecutor};
