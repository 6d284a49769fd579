use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::warn;

use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct HealthQuery {
    /// Also check that the vision oracle answers.
    #[serde(default)]
    pub deep: bool,
}

/// Liveness check. With `?deep=true` the oracle is contacted as well and an
/// unreachable oracle turns the response into 503.
pub async fn health_check(
    State(state): State<AppState>,
    Query(query): Query<HealthQuery>,
) -> impl IntoResponse {
    let mut body = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.matcher.model_name(),
    });
    if !query.deep {
        return (StatusCode::OK, Json(body));
    }

    let reachable = match state.matcher.health_check().await {
        Ok(reachable) => reachable,
        Err(e) => {
            warn!(error = %e, "Oracle health check failed");
            false
        }
    };
    body["oracle_reachable"] = reachable.into();
    if reachable {
        (StatusCode::OK, Json(body))
    } else {
        body["status"] = "degraded".into();
        (StatusCode::SERVICE_UNAVAILABLE, Json(body))
    }
}
