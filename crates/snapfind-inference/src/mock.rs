//! Mock oracle and image fetcher for deterministic testing.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use snapfind_inference::mock::{MockImageFetcher, MockOracle};
//!
//! // Confirms id_3 and id_17 in whichever batch carries them
//! let oracle = MockOracle::matching(["id_3", "id_17"]);
//! let fetcher = MockImageFetcher::new().failing_for("https://cdn/broken.jpg");
//! assert_eq!(oracle.call_count(), 0);
//! ```

use async_trait::async_trait;
use base64::Engine;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use snapfind_core::{EncodedImage, Error, ImageFetcher, OraclePrompt, Result, VisionOracle};

use crate::prompt::candidate_ids;

type Responder = dyn Fn(&OraclePrompt) -> Result<String> + Send + Sync;

/// Scripted oracle that records every prompt it receives.
#[derive(Clone)]
pub struct MockOracle {
    responder: Arc<Responder>,
    call_log: Arc<Mutex<Vec<OraclePrompt>>>,
    latency_ms: u64,
    healthy: bool,
}

impl MockOracle {
    /// Oracle that never finds a match.
    pub fn new() -> Self {
        Self::with_fixed_response(r#"{"matchedIds": []}"#)
    }

    /// Oracle that returns the same text for every prompt.
    pub fn with_fixed_response(response: impl Into<String>) -> Self {
        let response = response.into();
        Self::with_responder(move |_| Ok(response.clone()))
    }

    /// Oracle whose reply is computed from each prompt.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&OraclePrompt) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            call_log: Arc::new(Mutex::new(Vec::new())),
            latency_ms: 0,
            healthy: true,
        }
    }

    /// Oracle confirming exactly the given IDs among those each prompt carries.
    pub fn matching<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let wanted: HashSet<String> = ids.into_iter().map(Into::into).collect();
        Self::with_responder(move |prompt| Ok(matched_ids_json(prompt, &wanted)))
    }

    /// Set simulated latency for every call.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Report the oracle as unreachable from `health_check`.
    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    /// Number of `generate` calls made so far.
    pub fn call_count(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }

    /// Every prompt received, in call order.
    pub fn prompts(&self) -> Vec<OraclePrompt> {
        self.call_log.lock().unwrap().clone()
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

/// `{"matchedIds": [...]}` for the prompt's candidates that are in `wanted`.
pub fn matched_ids_json(prompt: &OraclePrompt, wanted: &HashSet<String>) -> String {
    let hits: Vec<String> = candidate_ids(prompt)
        .into_iter()
        .filter(|id| wanted.contains(id))
        .collect();
    serde_json::json!({ "matchedIds": hits }).to_string()
}

/// The error a failing oracle call produces for a simulated HTTP status.
pub fn http_failure(status: u16) -> Error {
    crate::gemini::to_snapfind_error(
        crate::gemini::GeminiErrorCode::from_status(status),
        &format!("mock status {}", status),
    )
}

#[async_trait]
impl VisionOracle for MockOracle {
    async fn generate(&self, prompt: &OraclePrompt) -> Result<String> {
        self.call_log.lock().unwrap().push(prompt.clone());
        if self.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;
        }
        (self.responder)(prompt)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.healthy)
    }

    fn model_name(&self) -> &str {
        "mock-vision"
    }
}

/// Fetcher that encodes the URL itself as the image, failing for chosen URLs.
#[derive(Clone, Default)]
pub struct MockImageFetcher {
    failing: Arc<HashSet<String>>,
    fetched: Arc<Mutex<Vec<String>>>,
}

impl MockImageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make fetches of `url` fail.
    pub fn failing_for(mut self, url: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.failing).insert(url.into());
        self
    }

    /// URLs requested so far, successful or not.
    pub fn fetched_urls(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageFetcher for MockImageFetcher {
    async fn fetch(&self, url: &str) -> Result<EncodedImage> {
        self.fetched.lock().unwrap().push(url.to_string());
        if self.failing.contains(url) {
            return Err(Error::CandidateFetch(format!("mock failure for {}", url)));
        }
        Ok(EncodedImage {
            mime_type: "image/jpeg".to_string(),
            data_b64: base64::engine::general_purpose::STANDARD.encode(url.as_bytes()),
        })
    }
}
