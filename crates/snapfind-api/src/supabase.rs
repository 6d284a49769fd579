//! Supabase collaborators: the event photo listing and bearer-token checks.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use snapfind_core::defaults;
use snapfind_core::{
    AuthenticatedUser, CandidatePhoto, CandidateSource, Error, Result, TokenVerifier,
};

fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_millis(defaults::FETCH_TIMEOUT_MS))
        .build()
        .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Row shape of the `photos` table as selected by the listing query.
#[derive(Debug, Deserialize)]
struct PhotoRow {
    id: serde_json::Value,
    file_url: Option<String>,
}

impl PhotoRow {
    fn into_candidate(self) -> Option<CandidatePhoto> {
        let id = match self.id {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let url = self.file_url.filter(|u| !u.is_empty())?;
        Some(CandidatePhoto::new(id, url))
    }
}

/// Lists recent event photos through the Supabase REST interface.
pub struct SupabasePhotoSource {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabasePhotoSource {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
        })
    }
}

#[async_trait]
impl CandidateSource for SupabasePhotoSource {
    #[instrument(skip(self), fields(subsystem = "api", component = "supabase", op = "recent_photos"))]
    async fn recent_photos(&self, limit: usize) -> Result<Vec<CandidatePhoto>> {
        let limit = limit.to_string();
        let response = self
            .client
            .get(format!("{}/rest/v1/photos", self.base_url))
            .query(&[
                ("select", "id,file_url"),
                ("order", "created_at.desc"),
                ("limit", limit.as_str()),
            ])
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(|e| Error::Request(format!("Photo listing request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Request(format!(
                "Photo listing failed with status {}: {}",
                status, body
            )));
        }

        let rows: Vec<PhotoRow> = response
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("Invalid photo listing: {}", e)))?;

        let total = rows.len();
        let photos: Vec<CandidatePhoto> = rows
            .into_iter()
            .filter_map(PhotoRow::into_candidate)
            .collect();
        if photos.len() < total {
            warn!(
                dropped = total - photos.len(),
                "Ignoring photo rows without a usable id or file_url"
            );
        }
        debug!(count = photos.len(), "Listed recent photos");
        Ok(photos)
    }
}

/// Resolves a caller's bearer token to a user via Supabase auth.
pub struct SupabaseTokenVerifier {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseTokenVerifier {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl TokenVerifier for SupabaseTokenVerifier {
    #[instrument(skip_all, fields(subsystem = "api", component = "supabase", op = "verify_token"))]
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::Request(format!("Token check failed: {}", e)))?;

        match response.status() {
            status if status.is_success() => response
                .json::<AuthenticatedUser>()
                .await
                .map_err(|e| Error::Serialization(format!("Invalid user payload: {}", e))),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(Error::Unauthorized("Invalid or expired token".to_string()))
            }
            status => Err(Error::Request(format!(
                "Token check failed with status {}",
                status
            ))),
        }
    }
}
