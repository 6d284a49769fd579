//! # snapfind-core
//!
//! Core types, traits, and abstractions for snapfind.
//!
//! This crate provides the domain types shared by the face-match
//! orchestrator and its HTTP surface, the error taxonomy, and the
//! collaborator traits (oracle, image fetcher, photo store, auth).
//!
//! ## Logging convention
//!
//! Instrumented entry points carry `subsystem`, `component` and `op` fields.
//! Events use `batch_index`, `batch_size`, `candidate_id`, `match_count`,
//! `duration_ms`, `model`, `attempt` and `error` where they apply; request IDs
//! come from the `x-request-id` header set by the API.
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, every batch of a search failed |
//! | WARN  | Recoverable issue: skipped candidate, failed batch, retry |
//! | INFO  | Startup, search completions |
//! | DEBUG | Decision points, per-batch results |
//! | TRACE | Per-candidate iteration |

pub mod defaults;
pub mod error;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
