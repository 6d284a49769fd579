//! Face search handler.
//!
//! Takes a selfie (data URL or bare base64) and returns the event photos
//! showing the same person. Candidates are either supplied by the caller or
//! listed from the photo store.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use snapfind_core::defaults::CANDIDATE_LIMIT_MAX;
use snapfind_core::{CandidatePhoto, MatchReport, PhotoMatch, ReferenceImage};
use snapfind_inference::check_candidate_url;

use crate::{ApiError, AppState, RequireAuth};

/// Request body for a face search.
#[derive(Debug, Default, Deserialize)]
pub struct MatchFaceRequest {
    /// Reference image as a data URL or base64 string (required).
    #[serde(default)]
    pub image: Option<String>,
    /// Photos to search. When omitted the most recent event photos are used.
    #[serde(default)]
    pub candidates: Option<Vec<CandidatePhoto>>,
}

/// Response body for a face search.
#[derive(Debug, Serialize)]
pub struct MatchFaceResponse {
    pub matches: Vec<PhotoMatch>,
    pub match_count: usize,
    /// True when some candidates or batches could not be checked, so an
    /// empty or short list may be incomplete.
    pub degraded: bool,
    pub batches_attempted: usize,
    pub batches_failed: usize,
    pub candidates_skipped: usize,
    pub deadline_exceeded: bool,
}

impl From<MatchReport> for MatchFaceResponse {
    fn from(report: MatchReport) -> Self {
        let degraded = report.is_degraded();
        let matches: Vec<PhotoMatch> = report.matches.into_iter().map(PhotoMatch::from).collect();
        Self {
            match_count: matches.len(),
            matches,
            degraded,
            batches_attempted: report.batches_attempted,
            batches_failed: report.batches_failed,
            candidates_skipped: report.candidates_skipped,
            deadline_exceeded: report.deadline_exceeded,
        }
    }
}

/// Find the photos that show the person in the reference image.
///
/// # Returns
/// - 200 OK with matches and search counters
/// - 400 Bad Request if the image is missing or not valid base64, or a
///   supplied candidate URL is not https on a public host
/// - 401 Unauthorized without a valid bearer token
/// - 502 Bad Gateway if recent photos could not be listed
#[instrument(skip_all, fields(subsystem = "api", component = "match_face", op = "match_face"))]
pub async fn match_face(
    State(state): State<AppState>,
    auth: RequireAuth,
    payload: Result<Json<MatchFaceRequest>, JsonRejection>,
) -> Result<Json<MatchFaceResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let image = req
        .image
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("No image provided".to_string()))?;
    let reference = ReferenceImage::from_data_url(image)?;

    let candidates = match req.candidates {
        Some(mut supplied) => {
            if supplied.len() > CANDIDATE_LIMIT_MAX {
                warn!(
                    supplied = supplied.len(),
                    limit = CANDIDATE_LIMIT_MAX,
                    "Truncating supplied candidate list"
                );
                supplied.truncate(CANDIDATE_LIMIT_MAX);
            }
            for candidate in &supplied {
                check_candidate_url(&candidate.url)?;
            }
            supplied
        }
        None => state
            .photos
            .recent_photos(state.candidate_limit)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to list recent photos");
                ApiError::BadGateway(format!("Failed to list photos: {}", e))
            })?,
    };

    let report = state
        .matcher
        .find_matches(Some(&reference), &candidates)
        .await?;

    info!(
        user_id = auth.user.as_ref().map(|u| u.id.as_str()).unwrap_or("(anonymous)"),
        candidate_count = candidates.len(),
        match_count = report.matches.len(),
        degraded = report.is_degraded(),
        "Face search served"
    );

    Ok(Json(report.into()))
}
