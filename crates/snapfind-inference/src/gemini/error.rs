//! Gemini-specific error handling.

use snapfind_core::Error;

/// Gemini error classes, keyed on HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeminiErrorCode {
    /// Invalid or missing API key.
    AuthenticationError,
    /// Malformed request (bad image payload, bad parameters).
    BadRequest,
    /// Model not found or not available.
    ModelNotFound,
    /// Quota or rate limit exceeded.
    RateLimitExceeded,
    /// Server error.
    ServerError,
    /// Unknown error.
    Unknown,
}

impl GeminiErrorCode {
    /// Determine error code from HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::AuthenticationError,
            400 => Self::BadRequest,
            404 => Self::ModelNotFound,
            408 | 429 => Self::RateLimitExceeded,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimitExceeded | Self::ServerError)
    }
}

/// Convert a Gemini error to a snapfind Error.
pub fn to_snapfind_error(code: GeminiErrorCode, message: &str) -> Error {
    match code {
        GeminiErrorCode::AuthenticationError => {
            Error::Oracle(format!("Authentication failed: {}", message))
        }
        GeminiErrorCode::BadRequest => Error::Oracle(format!("Bad request: {}", message)),
        GeminiErrorCode::ModelNotFound => Error::Oracle(format!("Model not found: {}", message)),
        GeminiErrorCode::RateLimitExceeded => {
            Error::OracleUnavailable(format!("Rate limit exceeded: {}", message))
        }
        GeminiErrorCode::ServerError => {
            Error::OracleUnavailable(format!("Server error: {}", message))
        }
        GeminiErrorCode::Unknown => Error::Oracle(message.to_string()),
    }
}
