//! HTTP daemon support.
//!
//! This module provides:
//! - Configuration and secrets loading (`config`)
//! - The axum router exposing the `/api/ai/*` endpoints (`http`)
//!
//! The daemon binary builds one [`Orchestrator`](crate::Orchestrator) at
//! startup and hands it to [`router`] as shared state.

pub mod config;
pub mod http;

pub use http::router;
