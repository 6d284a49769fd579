//! # snapfind-api
//!
//! HTTP surface for face search: a bearer-authenticated `match-face`
//! endpoint in front of the batched matcher, plus a health check.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod supabase;

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderName, Method};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use governor::{Quota, RateLimiter};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use snapfind_core::{CandidateSource, Error, Result, TokenVerifier};
use snapfind_match::FaceMatcher;

pub use auth::RequireAuth;
pub use config::ApiConfig;
pub use error::ApiError;
pub use supabase::{SupabasePhotoSource, SupabaseTokenVerifier};

/// UUIDv7 request IDs (time-ordered, so logs sort by arrival).
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

pub type GlobalRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Build the global rate limiter: `requests` per `period_secs`.
pub fn build_rate_limiter(requests: u64, period_secs: u64) -> Result<Arc<GlobalRateLimiter>> {
    let burst = u32::try_from(requests)
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| Error::Config(format!("Invalid rate limit: {}", requests)))?;
    let quota = Quota::with_period(Duration::from_secs(period_secs) / burst.get())
        .ok_or_else(|| Error::Config("Rate limit period must be non-zero".to_string()))?
        .allow_burst(burst);
    Ok(Arc::new(RateLimiter::direct(quota)))
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub matcher: Arc<FaceMatcher>,
    pub photos: Arc<dyn CandidateSource>,
    /// `None` disables authentication.
    pub verifier: Option<Arc<dyn TokenVerifier>>,
    pub candidate_limit: usize,
    pub rate_limiter: Option<Arc<GlobalRateLimiter>>,
}

impl AppState {
    pub fn new(
        matcher: Arc<FaceMatcher>,
        photos: Arc<dyn CandidateSource>,
        verifier: Option<Arc<dyn TokenVerifier>>,
    ) -> Self {
        Self {
            matcher,
            photos,
            verifier,
            candidate_limit: snapfind_core::defaults::CANDIDATE_LIMIT,
            rate_limiter: None,
        }
    }

    pub fn with_candidate_limit(mut self, limit: usize) -> Self {
        self.candidate_limit = config::clamp_candidate_limit(limit);
        self
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<GlobalRateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }
}

async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    if let Some(limiter) = &state.rate_limiter {
        if limiter.check().is_err() {
            tracing::warn!("Rate limit exceeded");
            return ApiError::TooManyRequests(
                "Too many requests. Please wait before retrying.".to_string(),
            )
            .into_response();
        }
    }
    next.run(request).await
}

/// Build the application router.
pub fn router(state: AppState, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        // Only searches are rate limited
        .route(
            "/api/v1/match-face",
            post(handlers::match_face::match_face).route_layer(
                axum::middleware::from_fn_with_state(state.clone(), rate_limit_middleware),
            ),
        )
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([
                    header::AUTHORIZATION,
                    HeaderName::from_static("x-client-info"),
                    HeaderName::from_static("apikey"),
                    header::CONTENT_TYPE,
                ])
                .max_age(Duration::from_secs(3600)),
        )
        // Reference images arrive base64-encoded inside the JSON body
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(RequestBodyLimitLayer::new(body_limit_bytes))
        .with_state(state)
}
