//! Gemini vision oracle implementation.

use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use snapfind_core::defaults::{ENV_ORACLE_API_KEY, ORACLE_ENDPOINT, ORACLE_MODEL, ORACLE_TIMEOUT_MS};
use snapfind_core::{Error, OraclePrompt, Result, VisionOracle};

use super::error::{to_snapfind_error, GeminiErrorCode};
use super::types::{ErrorEnvelope, GenerateContentRequest, GenerateContentResponse};

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Configuration for the Gemini oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    /// REST base URL, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    /// Timeout for one `generateContent` call.
    pub request_timeout_ms: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: ORACLE_ENDPOINT.to_string(),
            api_key: String::new(),
            model: ORACLE_MODEL.to_string(),
            request_timeout_ms: ORACLE_TIMEOUT_MS,
        }
    }
}

impl GeminiConfig {
    /// Load from `GEMINI_API_KEY`, `GEMINI_ENDPOINT`, `GEMINI_MODEL` and `ORACLE_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(ENV_ORACLE_API_KEY)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Config(format!("{} not configured", ENV_ORACLE_API_KEY)))?;

        let config = Self {
            endpoint: std::env::var("GEMINI_ENDPOINT")
                .unwrap_or_else(|_| ORACLE_ENDPOINT.to_string()),
            api_key,
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| ORACLE_MODEL.to_string()),
            request_timeout_ms: std::env::var("ORACLE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(ORACLE_TIMEOUT_MS),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(Error::Config("Oracle api_key cannot be empty".to_string()));
        }

        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(Error::Config(format!(
                "Oracle endpoint must start with http:// or https://, got: {}",
                self.endpoint
            )));
        }

        if self.model.is_empty() {
            return Err(Error::Config("Oracle model cannot be empty".to_string()));
        }

        if self.request_timeout_ms == 0 {
            return Err(Error::Config(
                "Oracle request_timeout_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Vision oracle backed by the Gemini `generateContent` API.
pub struct GeminiOracle {
    client: Client,
    config: GeminiConfig,
}

impl GeminiOracle {
    /// Create a new oracle with the given configuration.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Initializing Gemini oracle: url={}, model={}, timeout={}ms",
            config.endpoint, config.model, config.request_timeout_ms
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    /// Get the current configuration.
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn model_url(&self) -> String {
        format!(
            "{}/models/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }
}

/// Pull the human-readable message out of an error body, if it has one.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl VisionOracle for GeminiOracle {
    #[instrument(skip(self, prompt), fields(subsystem = "inference", component = "gemini", op = "generate", model = %self.config.model, image_count = prompt.image_count()))]
    async fn generate(&self, prompt: &OraclePrompt) -> Result<String> {
        let start = Instant::now();
        let request = GenerateContentRequest::from_prompt(prompt);

        let response = self
            .client
            .post(format!("{}:generateContent", self.model_url()))
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::OracleUnavailable(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let code = GeminiErrorCode::from_status(status.as_u16());
            warn!(status = status.as_u16(), ?code, "Oracle returned error status");
            return Err(to_snapfind_error(
                code,
                &format!("{}: {}", status, error_message(&body)),
            ));
        }

        let result: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::Oracle(format!("Failed to parse response: {}", e)))?;

        let text = result.text().ok_or_else(|| {
            let reason = result
                .candidates
                .first()
                .and_then(|c| c.finish_reason.clone())
                .unwrap_or_else(|| "no candidates".to_string());
            Error::Oracle(format!("Response contained no text ({})", reason))
        })?;

        debug!(
            response_len = text.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Generation complete"
        );
        Ok(text)
    }

    async fn health_check(&self) -> Result<bool> {
        match self
            .client
            .get(self.model_url())
            .header(API_KEY_HEADER, &self.config.api_key)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GeminiConfig {
        GeminiConfig {
            api_key: "test-key".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = GeminiConfig::default();
        assert_eq!(config.endpoint, ORACLE_ENDPOINT);
        assert_eq!(config.model, ORACLE_MODEL);
        assert_eq!(config.request_timeout_ms, ORACLE_TIMEOUT_MS);
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn test_validate_requires_api_key() {
        let err = GeminiConfig::default().validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let config = GeminiConfig {
            endpoint: "ftp://example.com".to_string(),
            ..config()
        };
        assert!(config.validate().unwrap_err().to_string().contains("http://"));
    }

    #[test]
    fn test_validate_rejects_empty_model_and_zero_timeout() {
        let empty_model = GeminiConfig {
            model: String::new(),
            ..config()
        };
        assert!(empty_model.validate().is_err());

        let zero_timeout = GeminiConfig {
            request_timeout_ms: 0,
            ..config()
        };
        assert!(zero_timeout.validate().is_err());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        assert!(GeminiOracle::new(GeminiConfig::default()).is_err());
    }

    #[test]
    fn test_model_url_trims_trailing_slash() {
        let oracle = GeminiOracle::new(GeminiConfig {
            endpoint: "http://localhost:8080/v1beta/".to_string(),
            model: "gemini-test".to_string(),
            ..config()
        })
        .unwrap();
        assert_eq!(
            oracle.model_url(),
            "http://localhost:8080/v1beta/models/gemini-test"
        );
        assert_eq!(oracle.model_name(), "gemini-test");
    }

    #[test]
    fn test_error_message_prefers_envelope() {
        let body = r#"{"error": {"code": 400, "message": "Invalid image", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body), "Invalid image");
        assert_eq!(error_message("plain failure"), "plain failure");
    }
}
