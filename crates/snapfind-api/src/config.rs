//! Server configuration loaded from the environment.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | HOST | 0.0.0.0 | Bind address |
//! | PORT | 3000 | Bind port |
//! | SUPABASE_URL | (required) | Project URL for photo listing and token checks |
//! | SUPABASE_SERVICE_ROLE_KEY | (required) | Key sent with Supabase requests |
//! | CANDIDATE_LIMIT | 50 | Recent photos searched when none are supplied (max 200) |
//! | REQUIRE_AUTH | true | Reject requests without a valid bearer token |
//! | RATE_LIMIT_ENABLED | true | Global request rate limit |
//! | RATE_LIMIT_REQUESTS | 30 | Requests per period |
//! | RATE_LIMIT_PERIOD_SECS | 60 | Rate limit period |
//! | BODY_LIMIT_BYTES | 26214400 | Maximum request body |

use std::env;

use snapfind_core::defaults;
use snapfind_core::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub candidate_limit: usize,
    pub require_auth: bool,
    pub rate_limit_enabled: bool,
    pub rate_limit_requests: u64,
    pub rate_limit_period_secs: u64,
    pub body_limit_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: defaults::SERVER_PORT,
            supabase_url: String::new(),
            supabase_service_key: String::new(),
            candidate_limit: defaults::CANDIDATE_LIMIT,
            require_auth: true,
            rate_limit_enabled: true,
            rate_limit_requests: defaults::RATE_LIMIT_REQUESTS,
            rate_limit_period_secs: defaults::RATE_LIMIT_PERIOD_SECS,
            body_limit_bytes: defaults::BODY_LIMIT_BYTES,
        }
    }
}

fn flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();

        let supabase_url = env::var("SUPABASE_URL")
            .map_err(|_| Error::Config("SUPABASE_URL not set".to_string()))?;
        let supabase_service_key = env::var("SUPABASE_SERVICE_ROLE_KEY")
            .map_err(|_| Error::Config("SUPABASE_SERVICE_ROLE_KEY not set".to_string()))?;

        let config = Self {
            host: env::var("HOST").unwrap_or(d.host),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.port),
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_service_key,
            candidate_limit: env::var("CANDIDATE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(clamp_candidate_limit)
                .unwrap_or(d.candidate_limit),
            require_auth: flag("REQUIRE_AUTH", d.require_auth),
            rate_limit_enabled: flag("RATE_LIMIT_ENABLED", d.rate_limit_enabled),
            rate_limit_requests: env::var("RATE_LIMIT_REQUESTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.rate_limit_requests),
            rate_limit_period_secs: env::var("RATE_LIMIT_PERIOD_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.rate_limit_period_secs),
            body_limit_bytes: env::var("BODY_LIMIT_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.body_limit_bytes),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.supabase_url.starts_with("http://") && !self.supabase_url.starts_with("https://")
        {
            return Err(Error::Config(format!(
                "SUPABASE_URL must be an http(s) URL, got '{}'",
                self.supabase_url
            )));
        }
        if self.supabase_service_key.is_empty() {
            return Err(Error::Config(
                "SUPABASE_SERVICE_ROLE_KEY is empty".to_string(),
            ));
        }
        if self.rate_limit_enabled
            && (self.rate_limit_requests == 0 || self.rate_limit_period_secs == 0)
        {
            return Err(Error::Config(
                "Rate limit requests and period must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Keep a candidate count within 1..=CANDIDATE_LIMIT_MAX.
pub fn clamp_candidate_limit(limit: usize) -> usize {
    limit.clamp(1, defaults::CANDIDATE_LIMIT_MAX)
}
