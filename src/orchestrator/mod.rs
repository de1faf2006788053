//! Orchestrator: provider/model selection, caching, and fallback.
//!
//! [`Orchestrator`] is the single entry point for text generation. It picks
//! a route per request, serves repeats from the response cache, executes
//! through the [`ExecutorRegistry`](crate::providers::ExecutorRegistry), and
//! walks a fixed fallback chain when the selected route fails.

mod builder;
pub mod routing;
mod service;
mod stats;

pub use builder::OrchestratorBuilder;
pub use routing::Route;
pub use service::Orchestrator;
pub use stats::OrchestratorStats;
