//! Error types for snapfind.

use thiserror::Error;

/// Result type alias using snapfind's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for snapfind operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid input (missing or malformed reference image, bad request body)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A single candidate image could not be retrieved
    #[error("Candidate fetch failed: {0}")]
    CandidateFetch(String),

    /// The oracle rejected the request or returned output we cannot use
    #[error("Oracle error: {0}")]
    Oracle(String),

    /// The oracle is temporarily unavailable (network, timeout, 429, 5xx)
    #[error("Oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Authentication failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl Error {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::OracleUnavailable(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
