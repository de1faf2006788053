//! Public types for the orchestrator API.

mod message;
mod model;
mod provider;
mod request;
mod response;

pub use message::{Message, Role};
pub use model::{ModelCapability, NormalizedModel, UNAVAILABLE_SUFFIX};
pub use provider::{ModelTier, Provider, ProviderChoice};
pub use request::{CompletionRequest, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
pub use response::{APOLOGY_MESSAGE, CompletionResponse, StreamEvent, StreamSummary, Usage};
