//! Gemini vision oracle.
//!
//! Talks to the `generateContent` REST endpoint with interleaved text and
//! inline-image parts, optionally asking for a JSON completion.
//!
//! # Example
//!
//! ```rust,no_run
//! use snapfind_core::{OraclePrompt, VisionOracle};
//! use snapfind_inference::gemini::{GeminiConfig, GeminiOracle};
//!
//! #[tokio::main]
//! async fn main() {
//!     let oracle = GeminiOracle::new(GeminiConfig {
//!         api_key: "key".to_string(),
//!         ..Default::default()
//!     })
//!     .unwrap();
//!
//!     let prompt = OraclePrompt::new("Answer in JSON.").text("Say hello");
//!     let text = oracle.generate(&prompt).await.unwrap();
//! }
//! ```

mod backend;
mod error;
mod types;

pub use backend::{GeminiConfig, GeminiOracle};
pub use error::{to_snapfind_error, GeminiErrorCode};
pub use types::*;
