//! Face-match configuration.
//!
//! Everything the orchestrator needs is passed in explicitly. `from_env()`
//! exists for the binary; library code never reads the environment itself.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | GEMINI_API_KEY | (required) | Oracle API key |
//! | GEMINI_ENDPOINT | Gemini v1beta | Oracle REST base URL |
//! | GEMINI_MODEL | gemini-2.0-flash | Vision model |
//! | ORACLE_TIMEOUT_MS | 30000 | Per oracle call |
//! | MATCH_BATCH_SIZE | 10 | Candidates per oracle call |
//! | MATCH_CONCURRENCY | 1 | Batches in flight |
//! | MATCH_MAX_RETRIES | 0 | Retries for transient oracle failures |
//! | MATCH_RETRY_BACKOFF_MS | 500 | Backoff base |
//! | MATCH_DEADLINE_MS | 120000 | Overall search deadline |

use std::env;
use std::str::FromStr;

use snapfind_core::defaults;
use snapfind_core::{Error, Result};
use snapfind_inference::GeminiConfig;

/// Orchestration settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatcherConfig {
    /// Candidates per oracle call.
    pub batch_size: usize,
    /// Timeout for one oracle call.
    pub request_timeout_ms: u64,
    /// Batches processed at once; 1 is strictly sequential.
    pub max_concurrent_batches: usize,
    /// Retries for a transient oracle failure. Permanent failures are never retried.
    pub max_retries: u32,
    /// Base delay for exponential backoff between retries.
    pub retry_backoff_ms: u64,
    /// Overall deadline for one search.
    pub deadline_ms: u64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: defaults::BATCH_SIZE,
            request_timeout_ms: defaults::ORACLE_TIMEOUT_MS,
            max_concurrent_batches: defaults::MAX_CONCURRENT_BATCHES,
            max_retries: defaults::MAX_RETRIES,
            retry_backoff_ms: defaults::RETRY_BACKOFF_MS,
            deadline_ms: defaults::SEARCH_DEADLINE_MS,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl MatcherConfig {
    /// Load from `MATCH_*` and `ORACLE_TIMEOUT_MS` environment variables.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            batch_size: env_or("MATCH_BATCH_SIZE", d.batch_size),
            request_timeout_ms: env_or("ORACLE_TIMEOUT_MS", d.request_timeout_ms),
            max_concurrent_batches: env_or("MATCH_CONCURRENCY", d.max_concurrent_batches),
            max_retries: env_or("MATCH_MAX_RETRIES", d.max_retries),
            retry_backoff_ms: env_or("MATCH_RETRY_BACKOFF_MS", d.retry_backoff_ms),
            deadline_ms: env_or("MATCH_DEADLINE_MS", d.deadline_ms),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".to_string()));
        }
        if self.max_concurrent_batches == 0 {
            return Err(Error::Config(
                "max_concurrent_batches must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::Config(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.deadline_ms == 0 {
            return Err(Error::Config(
                "deadline_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Complete face-match configuration: oracle connection plus orchestration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceMatchConfig {
    pub oracle: GeminiConfig,
    pub matcher: MatcherConfig,
}

impl FaceMatchConfig {
    /// Load both halves from the environment.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            oracle: GeminiConfig::from_env()?,
            matcher: MatcherConfig::from_env(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.oracle.validate()?;
        self.matcher.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matcher_config() {
        let config = MatcherConfig::default();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.max_concurrent_batches, 1);
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.request_timeout_ms, defaults::ORACLE_TIMEOUT_MS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let cases = [
            MatcherConfig {
                batch_size: 0,
                ..Default::default()
            },
            MatcherConfig {
                max_concurrent_batches: 0,
                ..Default::default()
            },
            MatcherConfig {
                request_timeout_ms: 0,
                ..Default::default()
            },
            MatcherConfig {
                deadline_ms: 0,
                ..Default::default()
            },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(Error::Config(_))),
                "{:?} should be rejected",
                config
            );
        }
    }

    #[test]
    fn test_face_match_config_validates_oracle() {
        let config = FaceMatchConfig {
            oracle: GeminiConfig::default(),
            matcher: MatcherConfig::default(),
        };
        assert!(config.validate().is_err());

        let config = FaceMatchConfig {
            oracle: GeminiConfig {
                api_key: "key".into(),
                ..Default::default()
            },
            matcher: MatcherConfig::default(),
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_or_uses_default_when_unset() {
        assert_eq!(env_or("SNAPFIND_TEST_UNSET_VARIABLE", 7usize), 7);
    }
}
