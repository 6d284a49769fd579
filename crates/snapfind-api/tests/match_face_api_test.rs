//! Router-level tests for the match-face endpoint with in-process collaborators.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use snapfind_api::{build_rate_limiter, router, AppState};
use snapfind_core::{
    AuthenticatedUser, CandidatePhoto, CandidateSource, Error, Result, TokenVerifier,
};
use snapfind_inference::mock::{MockImageFetcher, MockOracle};
use snapfind_match::{FaceMatcher, MatcherConfig};

const SELFIE: &str = "data:image/jpeg;base64,/9j/4AAQSkZJRg==";
const BODY_LIMIT: usize = 1024 * 1024;

struct StaticPhotos {
    photos: Result<Vec<CandidatePhoto>>,
    requested_limits: Mutex<Vec<usize>>,
}

impl StaticPhotos {
    fn new(n: usize) -> Self {
        Self {
            photos: Ok((0..n)
                .map(|i| CandidatePhoto::new(format!("id_{}", i), format!("https://cdn/{}.jpg", i)))
                .collect()),
            requested_limits: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            photos: Err(Error::Request("connection refused".into())),
            requested_limits: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CandidateSource for StaticPhotos {
    async fn recent_photos(&self, limit: usize) -> Result<Vec<CandidatePhoto>> {
        self.requested_limits.lock().unwrap().push(limit);
        match &self.photos {
            Ok(photos) => Ok(photos.iter().take(limit).cloned().collect()),
            Err(e) => Err(Error::Request(e.to_string())),
        }
    }
}

struct SingleToken;

#[async_trait]
impl TokenVerifier for SingleToken {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser> {
        if token == "good-token" {
            Ok(AuthenticatedUser {
                id: "user-1".into(),
                email: None,
            })
        } else {
            Err(Error::Unauthorized("Invalid or expired token".into()))
        }
    }
}

struct Harness {
    oracle: MockOracle,
    photos: Arc<StaticPhotos>,
    state: AppState,
}

impl Harness {
    fn new(oracle: MockOracle, photos: StaticPhotos) -> Self {
        let matcher = FaceMatcher::new(
            Arc::new(oracle.clone()),
            Arc::new(MockImageFetcher::new()),
            MatcherConfig::default(),
        );
        let photos = Arc::new(photos);
        let state = AppState::new(
            Arc::new(matcher),
            photos.clone(),
            Some(Arc::new(SingleToken)),
        );
        Self {
            oracle,
            photos,
            state,
        }
    }

    fn app(&self) -> Router {
        router(self.state.clone(), BODY_LIMIT)
    }
}

fn match_request(token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/v1/match-face")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_match_face_lists_recent_photos() {
    let h = Harness::new(MockOracle::matching(["id_3", "id_17"]), StaticPhotos::new(25));

    let response = h
        .app()
        .oneshot(match_request(
            Some("good-token"),
            serde_json::json!({"image": SELFIE}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = json_body(response).await;

    assert_eq!(body["match_count"], 2);
    assert_eq!(body["matches"][0]["id"], "id_3");
    assert_eq!(body["matches"][0]["url"], "https://cdn/3.jpg");
    assert_eq!(body["matches"][1]["id"], "id_17");
    assert_eq!(body["degraded"], false);
    assert_eq!(body["batches_attempted"], 3);
    assert_eq!(*h.photos.requested_limits.lock().unwrap(), vec![50]);
}

#[tokio::test]
async fn test_match_face_uses_supplied_candidates() {
    let h = Harness::new(MockOracle::matching(["b"]), StaticPhotos::new(5));

    let response = h
        .app()
        .oneshot(match_request(
            Some("good-token"),
            serde_json::json!({
                "image": SELFIE,
                "candidates": [
                    {"id": "a", "url": "https://cdn/a.jpg"},
                    {"id": "b", "file_url": "https://cdn/b.jpg"}
                ]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["matches"], serde_json::json!([{"id": "b", "url": "https://cdn/b.jpg"}]));
    assert!(h.photos.requested_limits.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_supplied_candidates_are_capped() {
    let h = Harness::new(MockOracle::new(), StaticPhotos::new(0));
    let candidates: Vec<serde_json::Value> = (0..250)
        .map(|i| serde_json::json!({"id": format!("c{}", i), "url": format!("https://cdn/{}.jpg", i)}))
        .collect();

    let response = h
        .app()
        .oneshot(match_request(
            Some("good-token"),
            serde_json::json!({"image": SELFIE, "candidates": candidates}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["batches_attempted"], 20);
    assert_eq!(h.oracle.call_count(), 20);
}

#[tokio::test]
async fn test_supplied_internal_candidate_urls_are_rejected() {
    let h = Harness::new(MockOracle::new(), StaticPhotos::new(0));

    for url in [
        "http://cdn/a.jpg",
        "https://169.254.169.254/latest/meta-data",
        "https://localhost/admin",
        "file:///etc/passwd",
    ] {
        let response = h
            .app()
            .oneshot(match_request(
                Some("good-token"),
                serde_json::json!({
                    "image": SELFIE,
                    "candidates": [
                        {"id": "ok", "url": "https://cdn/ok.jpg"},
                        {"id": "bad", "url": url}
                    ]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", url);
        assert!(json_body(response).await["error"].is_string());
    }
    assert_eq!(h.oracle.call_count(), 0);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let h = Harness::new(MockOracle::new(), StaticPhotos::new(5));

    let response = h
        .app()
        .oneshot(match_request(None, serde_json::json!({"image": SELFIE})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(json_body(response).await["error"].is_string());
    assert_eq!(h.oracle.call_count(), 0);
}

#[tokio::test]
async fn test_rejected_token_is_unauthorized() {
    let h = Harness::new(MockOracle::new(), StaticPhotos::new(5));

    let response = h
        .app()
        .oneshot(match_request(
            Some("stale-token"),
            serde_json::json!({"image": SELFIE}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        json_body(response).await["error"],
        "Invalid or expired token"
    );
}

#[tokio::test]
async fn test_auth_can_be_disabled() {
    let mut h = Harness::new(MockOracle::matching(["id_0"]), StaticPhotos::new(3));
    h.state.verifier = None;

    let response = h
        .app()
        .oneshot(match_request(None, serde_json::json!({"image": SELFIE})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["match_count"], 1);
}

#[tokio::test]
async fn test_missing_image_is_bad_request() {
    let h = Harness::new(MockOracle::new(), StaticPhotos::new(5));

    for body in [
        serde_json::json!({}),
        serde_json::json!({"image": ""}),
        serde_json::json!({"image": "data:image/jpeg;base64,"}),
        serde_json::json!({"image": "data:image/jpeg;base64,%%%not-base64%%%"}),
    ] {
        let response = h
            .app()
            .oneshot(match_request(Some("good-token"), body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {}", body);
        assert!(json_body(response).await["error"].is_string());
    }
    assert_eq!(h.oracle.call_count(), 0);
    assert!(h.photos.requested_limits.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let h = Harness::new(MockOracle::new(), StaticPhotos::new(5));
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/match-face")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, "Bearer good-token")
        .body(Body::from("{not json"))
        .unwrap();

    let response = h.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
}

#[tokio::test]
async fn test_photo_listing_failure_is_bad_gateway() {
    let h = Harness::new(MockOracle::new(), StaticPhotos::failing());

    let response = h
        .app()
        .oneshot(match_request(
            Some("good-token"),
            serde_json::json!({"image": SELFIE}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(h.oracle.call_count(), 0);
}

#[tokio::test]
async fn test_total_oracle_failure_is_degraded_not_error() {
    let h = Harness::new(
        MockOracle::with_responder(|_| Err(snapfind_inference::mock::http_failure(500))),
        StaticPhotos::new(15),
    );

    let response = h
        .app()
        .oneshot(match_request(
            Some("good-token"),
            serde_json::json!({"image": SELFIE}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["matches"], serde_json::json!([]));
    assert_eq!(body["degraded"], true);
    assert_eq!(body["batches_failed"], 2);
}

#[tokio::test]
async fn test_rate_limit_returns_429() {
    let mut h = Harness::new(MockOracle::new(), StaticPhotos::new(1));
    h.state = h.state.clone().with_rate_limiter(build_rate_limiter(1, 60).unwrap());
    let app = h.app();

    let first = app
        .clone()
        .oneshot(match_request(
            Some("good-token"),
            serde_json::json!({"image": SELFIE}),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(match_request(
            Some("good-token"),
            serde_json::json!({"image": SELFIE}),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(json_body(second).await["error"].is_string());
    assert_eq!(h.oracle.call_count(), 1);
}

#[tokio::test]
async fn test_health_is_not_rate_limited() {
    let mut h = Harness::new(MockOracle::new(), StaticPhotos::new(1));
    h.state = h.state.clone().with_rate_limiter(build_rate_limiter(1, 60).unwrap());
    let app = h.app();

    let search = app
        .clone()
        .oneshot(match_request(
            Some("good-token"),
            serde_json::json!({"image": SELFIE}),
        ))
        .await
        .unwrap();
    assert_eq!(search.status(), StatusCode::OK);

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_health_reports_model() {
    let h = Harness::new(MockOracle::new(), StaticPhotos::new(0));

    let response = h
        .app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model"], "mock-vision");
    assert!(body.get("oracle_reachable").is_none());
}

#[tokio::test]
async fn test_deep_health_checks_oracle() {
    let h = Harness::new(MockOracle::new(), StaticPhotos::new(0));

    let response = h
        .app()
        .oneshot(Request::get("/health?deep=true").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["oracle_reachable"], true);
}

#[tokio::test]
async fn test_deep_health_reports_unreachable_oracle() {
    let h = Harness::new(MockOracle::new().unhealthy(), StaticPhotos::new(0));

    let response = h
        .app()
        .oneshot(Request::get("/health?deep=true").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["oracle_reachable"], false);
}

#[tokio::test]
async fn test_cors_preflight_allows_client_headers() {
    let h = Harness::new(MockOracle::new(), StaticPhotos::new(0));
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/v1/match-face")
        .header(header::ORIGIN, "https://app.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(
            header::ACCESS_CONTROL_REQUEST_HEADERS,
            "authorization,x-client-info,apikey,content-type",
        )
        .body(Body::empty())
        .unwrap();

    let response = h.app().oneshot(request).await.unwrap();
    assert!(response.status().is_success());
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
    let allowed = response.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS]
        .to_str()
        .unwrap()
        .to_lowercase();
    assert!(allowed.contains("x-client-info"));
    assert!(allowed.contains("apikey"));
}
