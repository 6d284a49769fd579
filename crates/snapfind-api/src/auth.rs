//! Bearer-token authentication.

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use tracing::debug;

use snapfind_core::AuthenticatedUser;

use crate::{ApiError, AppState};

/// Extractor that requires a valid `Authorization: Bearer <token>` header.
///
/// When the server runs without a token verifier every request passes and
/// `user` is `None`.
#[derive(Debug, Clone)]
pub struct RequireAuth {
    pub user: Option<AuthenticatedUser>,
}

/// The token from a `Bearer` authorization header, if present and non-empty.
pub fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[axum::async_trait]
impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(verifier) = &state.verifier else {
            return Ok(RequireAuth { user: None });
        };

        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized".to_string()))?;

        let user = verifier.verify(token).await?;
        debug!(user_id = %user.id, "Authenticated request");
        Ok(RequireAuth { user: Some(user) })
    }
}
