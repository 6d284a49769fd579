//! # snapfind-inference
//!
//! Vision oracle client and candidate image fetching for snapfind.
//!
//! This crate provides:
//! - Gemini `generateContent` oracle implementing [`VisionOracle`]
//! - HTTP candidate image fetcher implementing [`ImageFetcher`]
//! - Face-match prompt construction
//! - Lenient parsing of the oracle's `{"matchedIds": [...]}` verdicts
//! - Mock oracle and fetcher (feature `mock`)
//!
//! # Feature Flags
//!
//! - `mock`: Enable [`mock`] for tests in dependent crates

pub mod fetch;
pub mod gemini;
pub mod prompt;
pub mod verdict;

// Mock oracle and fetcher for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use snapfind_core::*;

pub use fetch::{check_candidate_url, HttpImageFetcher};
pub use gemini::{GeminiConfig, GeminiErrorCode, GeminiOracle};
pub use prompt::{candidate_ids, face_match_prompt, FACE_MATCH_INSTRUCTION};
pub use verdict::{strip_code_fence, OracleVerdict};
