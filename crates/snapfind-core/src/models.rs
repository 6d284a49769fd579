//! Domain models for face search.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::defaults::DEFAULT_IMAGE_MIME;
use crate::error::{Error, Result};

/// The user-supplied selfie used as the search key.
///
/// Request-scoped: decoded once per search and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub mime_type: String,
    /// Standard base64 payload with any data-URL prefix removed.
    pub data_b64: String,
}

impl ReferenceImage {
    /// Parse a `data:<mime>;base64,<payload>` URL or a bare base64 string.
    pub fn from_data_url(input: &str) -> Result<Self> {
        let input = input.trim();
        let (mime_type, payload) = match input.strip_prefix("data:") {
            Some(rest) => {
                let (header, payload) = rest.split_once(',').ok_or_else(|| {
                    Error::InvalidInput("Malformed data URL: missing ',' separator".into())
                })?;
                let mime = header
                    .split(';')
                    .next()
                    .filter(|m| !m.is_empty())
                    .unwrap_or(DEFAULT_IMAGE_MIME);
                (mime.to_string(), payload.trim())
            }
            None => (DEFAULT_IMAGE_MIME.to_string(), input),
        };

        if payload.is_empty() {
            return Err(Error::InvalidInput("Reference image is empty".into()));
        }

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| Error::InvalidInput(format!("Invalid base64 image data: {}", e)))?;
        if decoded.is_empty() {
            return Err(Error::InvalidInput("Reference image is empty".into()));
        }

        Ok(Self {
            mime_type,
            data_b64: payload.to_string(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.data_b64.is_empty()
    }

    /// The reference as an inline prompt image.
    pub fn as_encoded(&self) -> EncodedImage {
        EncodedImage {
            mime_type: self.mime_type.clone(),
            data_b64: self.data_b64.clone(),
        }
    }
}

/// A stored photo evaluated against the reference image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidatePhoto {
    pub id: String,
    /// The photo store names this column `file_url`.
    #[serde(alias = "file_url")]
    pub url: String,
}

impl CandidatePhoto {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

/// A base64 image ready to be inlined into an oracle prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: String,
    pub data_b64: String,
}

/// A matched photo as returned to API callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoMatch {
    pub id: String,
    pub url: String,
    /// Face distance, when the matcher produces one. The oracle path never does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
}

impl From<CandidatePhoto> for PhotoMatch {
    fn from(photo: CandidatePhoto) -> Self {
        Self {
            id: photo.id,
            url: photo.url,
            distance: None,
        }
    }
}

/// Outcome of one face search.
///
/// `matches` is always a subset of the searched candidates, in batch order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchReport {
    pub matches: Vec<CandidatePhoto>,
    /// Batches the candidate list was partitioned into.
    pub batches_total: usize,
    /// Batches that ran to completion before the deadline.
    pub batches_attempted: usize,
    /// Attempted batches that contributed nothing because the oracle failed.
    pub batches_failed: usize,
    /// Candidates dropped because their image could not be fetched.
    pub candidates_skipped: usize,
    /// The overall deadline stopped the search early.
    pub deadline_exceeded: bool,
}

impl MatchReport {
    /// An empty result may not mean "no matches" when this is true.
    pub fn is_degraded(&self) -> bool {
        self.batches_failed > 0 || self.candidates_skipped > 0 || self.deadline_exceeded
    }

    /// Every attempted batch failed.
    pub fn is_total_failure(&self) -> bool {
        self.batches_attempted > 0 && self.batches_failed == self.batches_attempted
    }
}

/// Identity of the bearer-token holder making a request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthenticatedUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}
