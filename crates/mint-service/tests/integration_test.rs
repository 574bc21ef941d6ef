//! Integration tests for Mint Service

use artmint_common::{GeneratedImage, MintError, MintReceipt, MintRequest, StorageLocator};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use mint_pipeline::{ContentStore, ImageAcquirer, MintOrchestrator, MintSubmitter, ModelRegistry};
use mint_service::{create_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tower::ServiceExt; // for `oneshot`

const IMAGE: &[u8] = &[0xff, 0xd8, 0xff, 0xe0];

/// Generates a fixed image, optionally waiting for a release first
struct FakeAcquirer {
    gate: Option<Arc<Notify>>,
}

#[async_trait]
impl ImageAcquirer for FakeAcquirer {
    async fn acquire(&self, request: &MintRequest) -> Result<GeneratedImage, MintError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &request.uploaded_file {
            Some(file) => Ok(GeneratedImage::from(file.clone())),
            None => Ok(GeneratedImage::new(IMAGE.to_vec(), "image/jpeg")),
        }
    }
}

struct FakeStore;

#[async_trait]
impl ContentStore for FakeStore {
    async fn upload(&self, _image: &GeneratedImage) -> Result<StorageLocator, MintError> {
        Ok(StorageLocator::from_cid("https://ipfs.filebase.io", "QmXYZ"))
    }
}

struct FakeSubmitter {
    error: Option<MintError>,
}

#[async_trait]
impl MintSubmitter for FakeSubmitter {
    async fn submit(&self, locator: &StorageLocator) -> Result<MintReceipt, MintError> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(MintReceipt {
                transaction_hash: "0xfeed".to_string(),
                block_number: 1,
                token_uri: locator.clone(),
            }),
        }
    }
}

fn create_test_app(gate: Option<Arc<Notify>>, submit_error: Option<MintError>) -> Router {
    let orchestrator = MintOrchestrator::new(
        Arc::new(FakeAcquirer { gate }),
        Arc::new(FakeStore),
        Arc::new(FakeSubmitter {
            error: submit_error,
        }),
        Arc::new(ModelRegistry::builtin("hf_test")),
    );
    create_router(AppState::new(orchestrator))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_mint(app: &Router, payload: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/mint")
                .method("POST")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn wait_for_status(app: &Router, expected: &str) -> Value {
    for _ in 0..200 {
        let (_, json) = get_json(app, "/api/status").await;
        if json["status"] == expected {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("status never became {}", expected);
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app(None, None);

    let (status, json) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "mint-service");
}

#[tokio::test]
async fn test_list_models() {
    let app = create_test_app(None, None);

    let (status, json) = get_json(&app, "/api/models").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["models"],
        json!(["Stable Diffusion 2", "Stable Diffusion XL Base 1.0"])
    );
}

#[tokio::test]
async fn test_initial_status_is_idle() {
    let app = create_test_app(None, None);

    let (status, json) = get_json(&app, "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "idle");
    assert_eq!(json["has_preview"], false);
    assert!(json.get("locator").is_none());

    let (status, _) = get(&app, "/api/preview").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mint_runs_to_success() {
    let app = create_test_app(None, None);

    let (status, json) = post_mint(
        &app,
        json!({"name": "A", "description": "a red cube", "model": "Stable Diffusion 2"}),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["success"], true);
    let run_id = json["run_id"].as_str().unwrap().to_string();

    let snapshot = wait_for_status(&app, "succeeded").await;
    assert_eq!(snapshot["run_id"], run_id);
    assert_eq!(snapshot["locator"], "https://ipfs.filebase.io/ipfs/QmXYZ");
    assert_eq!(snapshot["outcome"]["result"], "minted");
    assert_eq!(snapshot["has_preview"], true);

    let (status, bytes) = get(&app, "/api/preview").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, IMAGE);
}

#[tokio::test]
async fn test_mint_with_uploaded_file() {
    let app = create_test_app(None, None);

    let (status, _) = post_mint(
        &app,
        json!({
            "name": "B",
            "model": "Stable Diffusion 2",
            "file": {"data": "iVBORw==", "mime_type": "image/png"},
        }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    wait_for_status(&app, "succeeded").await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/preview").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.headers()["content-type"], "image/png");
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(body.as_ref(), &[0x89, b'P', b'N', b'G']);
}

#[tokio::test]
async fn test_mint_with_uploaded_file_and_no_model() {
    let app = create_test_app(None, None);

    let (status, json) = post_mint(
        &app,
        json!({"name": "B", "file": {"data": "iVBORw==", "mime_type": "image/png"}}),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["success"], true);

    let snapshot = wait_for_status(&app, "succeeded").await;
    assert_eq!(snapshot["locator"], "https://ipfs.filebase.io/ipfs/QmXYZ");
}

#[tokio::test]
async fn test_mint_validation_errors() {
    let app = create_test_app(None, None);

    let (status, json) = post_mint(
        &app,
        json!({"name": "", "description": "", "model": "Stable Diffusion 2"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "validation");

    let (status, json) = post_mint(
        &app,
        json!({
            "name": "A",
            "model": "Stable Diffusion 2",
            "file": {"data": "@@@", "mime_type": "image/png"},
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("base64"));

    let (_, json) = get_json(&app, "/api/status").await;
    assert_eq!(json["status"], "idle");
}

#[tokio::test]
async fn test_second_mint_conflicts_while_busy() {
    let gate = Arc::new(Notify::new());
    let app = create_test_app(Some(gate.clone()), None);
    let payload = json!({"name": "A", "description": "a red cube", "model": "Stable Diffusion 2"});

    let (status, _) = post_mint(&app, payload.clone()).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, json) = post_mint(&app, payload.clone()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "run_in_progress");

    let (_, json) = get_json(&app, "/api/status").await;
    assert_eq!(json["status"], "generating_image");
    assert_eq!(json["message"], "Generating Image...");

    gate.notify_one();
    wait_for_status(&app, "succeeded").await;

    let (status, _) = post_mint(&app, payload).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    gate.notify_one();
}

#[tokio::test]
async fn test_failed_run_reports_stage_and_error() {
    let app = create_test_app(
        None,
        Some(MintError::submission("User denied transaction signature.")),
    );

    let (status, _) = post_mint(
        &app,
        json!({"name": "A", "description": "a red cube", "model": "Stable Diffusion 2"}),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let snapshot = wait_for_status(&app, "failed").await;
    assert_eq!(snapshot["outcome"]["result"], "failed");
    assert_eq!(snapshot["outcome"]["stage"], "awaiting_mint_confirmation");
    assert_eq!(snapshot["outcome"]["error"]["kind"], "mint_submission_failed");
    assert!(snapshot.get("locator").is_none());
}
