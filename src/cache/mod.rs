//! Caching subsystem.
//!
//! - [`ResponseCache`]: bounded LRU + TTL memoization of completion
//!   responses, owned by the orchestrator.
//!
//! The model catalog and health probe keep their own caches (see
//! [`catalog`](crate::catalog) and [`health`](crate::health)); none of the
//! three share state.

pub mod response;

pub use response::{CacheConfig, CacheKey, ResponseCache};
