//! Centralized default constants for snapfind.
//!
//! **This module is the single source of truth** for shared default values.
//! All crates should reference these constants instead of defining their own
//! magic numbers.

// =============================================================================
// BATCHING
// =============================================================================

/// Candidates per oracle call. Bounds the per-request payload sent to the model.
pub const BATCH_SIZE: usize = 10;

/// Batches in flight at once. 1 keeps processing strictly sequential.
pub const MAX_CONCURRENT_BATCHES: usize = 1;

/// Retries for a batch whose oracle call failed transiently.
pub const MAX_RETRIES: u32 = 0;

/// Base delay for exponential retry backoff (milliseconds).
pub const RETRY_BACKOFF_MS: u64 = 500;

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Timeout for a single oracle call (milliseconds).
pub const ORACLE_TIMEOUT_MS: u64 = 30_000;

/// Overall deadline for one face search (milliseconds).
pub const SEARCH_DEADLINE_MS: u64 = 120_000;

/// Timeout for fetching one candidate image (milliseconds).
pub const FETCH_TIMEOUT_MS: u64 = 15_000;

/// Redirects followed when fetching one candidate image.
pub const MAX_FETCH_REDIRECTS: usize = 3;

// =============================================================================
// IMAGES
// =============================================================================

/// Largest candidate image we will inline into a prompt.
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// MIME type assumed when neither headers nor magic bytes identify the image.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

// =============================================================================
// ORACLE
// =============================================================================

/// Default generative endpoint (Gemini REST API).
pub const ORACLE_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default vision model.
pub const ORACLE_MODEL: &str = "gemini-2.0-flash";

/// Environment variable holding the oracle API key.
pub const ENV_ORACLE_API_KEY: &str = "GEMINI_API_KEY";

// =============================================================================
// CANDIDATES
// =============================================================================

/// Recent photos considered when the caller does not supply candidates.
pub const CANDIDATE_LIMIT: usize = 50;

/// Hard cap on candidates per search.
pub const CANDIDATE_LIMIT_MAX: usize = 200;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Request body limit. Reference images arrive base64-encoded in JSON.
pub const BODY_LIMIT_BYTES: usize = 25 * 1024 * 1024;

/// Default rate limit: max requests per period.
pub const RATE_LIMIT_REQUESTS: u64 = 30;

/// Default rate limit: period in seconds.
pub const RATE_LIMIT_PERIOD_SECS: u64 = 60;
