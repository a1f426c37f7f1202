//! Integration test: Server routes other than prediction

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use penguin_classifier::inference::InferenceService;
use penguin_classifier::loader::{self, LocalConfig, LoadSource};
use penguin_classifier::server::{create_router, AppState, WELCOME_MESSAGE};
use serde_json::{json, Value};
use tower::ServiceExt;

fn bundled() -> LocalConfig {
    let data = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data");
    LocalConfig {
        model_path: data.join("model.json"),
        metadata_path: data.join("encoders.json"),
    }
}

fn app_with(service: InferenceService) -> axum::Router {
    let state = Arc::new(AppState::new(service));
    create_router(state)
}

fn ready_app() -> axum::Router {
    let model = loader::local::load(&bundled()).unwrap();
    app_with(InferenceService::from_loaded(model, LoadSource::Local))
}

async fn send(app: axum::Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 64).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ============================================================================
// Root and health
// ============================================================================

#[tokio::test]
async fn test_root_returns_welcome() {
    let (status, body) = send(ready_app(), "GET", "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": WELCOME_MESSAGE }));
    assert_eq!(body["message"], "Hello! Welcome to the Penguins Classification API.");
}

#[tokio::test]
async fn test_health_when_loaded() {
    let (status, body) = send(ready_app(), "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "source": "local" }));
}

#[tokio::test]
async fn test_health_when_degraded() {
    let (status, body) = send(app_with(InferenceService::not_ready()), "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "degraded", "source": "unknown" }));
}

#[tokio::test]
async fn test_health_is_stable_across_requests() {
    let app = ready_app();
    for _ in 0..3 {
        let (_, body) = send(app.clone(), "GET", "/health").await;
        assert_eq!(body["status"], "ok");
    }
}

// ============================================================================
// Fallbacks
// ============================================================================

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (status, body) = send(ready_app(), "GET", "/models").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "detail": "Not Found" }));
}

#[tokio::test]
async fn test_wrong_method_is_405() {
    let (status, body) = send(ready_app(), "GET", "/predict").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, json!({ "detail": "Method Not Allowed" }));

    let (status, _) = send(ready_app(), "POST", "/health").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
