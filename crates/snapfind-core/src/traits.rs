//! Collaborator traits for snapfind.
//!
//! The orchestrator and the HTTP surface only talk to the outside world
//! through these seams, so every network dependency can be mocked.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{AuthenticatedUser, CandidatePhoto, EncodedImage};

// =============================================================================
// ORACLE
// =============================================================================

/// One part of a multimodal prompt, in send order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPart {
    Text(String),
    Image(EncodedImage),
}

/// A task instruction plus interleaved text and image parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OraclePrompt {
    pub instruction: String,
    pub parts: Vec<PromptPart>,
    /// Ask the model for a JSON-formatted completion.
    pub json_response: bool,
}

impl OraclePrompt {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            parts: Vec::new(),
            json_response: false,
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(PromptPart::Text(text.into()));
        self
    }

    pub fn image(mut self, image: EncodedImage) -> Self {
        self.parts.push(PromptPart::Image(image));
        self
    }

    pub fn with_json_response(mut self) -> Self {
        self.json_response = true;
        self
    }

    /// Number of image parts.
    pub fn image_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, PromptPart::Image(_)))
            .count()
    }

    /// Text parts, in order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|p| match p {
            PromptPart::Text(t) => Some(t.as_str()),
            PromptPart::Image(_) => None,
        })
    }
}

/// A generative vision model used as the face-matching decision function.
#[async_trait]
pub trait VisionOracle: Send + Sync {
    /// Send the prompt and return the raw model text.
    async fn generate(&self, prompt: &OraclePrompt) -> Result<String>;

    /// Check if the oracle is reachable.
    async fn health_check(&self) -> Result<bool>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

// =============================================================================
// PHOTO STORE
// =============================================================================

/// Retrieves candidate image bytes by URL.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<EncodedImage>;
}

/// Lists candidate photos from the photo store.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Most recent photos first, at most `limit`.
    async fn recent_photos(&self, limit: usize) -> Result<Vec<CandidatePhoto>>;
}

// =============================================================================
// AUTH
// =============================================================================

/// Resolves a bearer token to a user.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser>;
}
