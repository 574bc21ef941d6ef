//! API handlers for Mint Service

use artmint_common::MintError;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use mint_pipeline::MintOrchestrator;
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::{MintRequestBody, MintResponse, ModelsResponse, StatusResponse};

/// Shared application state
pub struct AppState {
    pub orchestrator: Arc<MintOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: MintOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }
}

/// API Error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub kind: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.kind {
            Some(kind) => serde_json::json!({ "error": self.message, "kind": kind }),
            None => serde_json::json!({ "error": self.message }),
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<MintError> for ApiError {
    fn from(err: MintError) -> Self {
        let status = match &err {
            MintError::Validation { .. } | MintError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            MintError::RunInProgress => StatusCode::CONFLICT,
            MintError::Abandoned => StatusCode::INTERNAL_SERVER_ERROR,
            MintError::GenerationFailed { .. }
            | MintError::UploadFailed { .. }
            | MintError::MintSubmissionFailed { .. } => StatusCode::BAD_GATEWAY,
        };

        ApiError {
            status,
            message: err.to_string(),
            kind: Some(err.kind()),
        }
    }
}

/// Health check
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "mint-service"
    }))
}

/// Selectable inference models
pub async fn list_models_handler(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    let models = state
        .orchestrator
        .models()
        .names()
        .map(str::to_string)
        .collect();

    Json(ModelsResponse { models })
}

/// Claim the run slot and drive the run in the background
pub async fn start_mint_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<MintRequestBody>,
) -> Result<(StatusCode, Json<MintResponse>), ApiError> {
    info!("Mint requested: '{}'", payload.name);

    let request = payload.into_request()?;
    let run = state.orchestrator.try_start(request).map_err(|e| {
        warn!("Mint rejected: {}", e);
        ApiError::from(e)
    })?;
    let run_id = run.id();

    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        let outcome = orchestrator.drive(run).await;
        info!("Run {} finished (success: {})", run_id, outcome.is_success());
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(MintResponse {
            success: true,
            run_id,
        }),
    ))
}

/// Current run state
pub async fn get_status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse::from(state.orchestrator.snapshot()))
}

/// Image of the current or last run
pub async fn get_preview_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    match state.orchestrator.snapshot().preview {
        Some(image) => Ok(([(header::CONTENT_TYPE, image.mime_type)], image.bytes).into_response()),
        None => Err(ApiError {
            status: StatusCode::NOT_FOUND,
            message: "No image available".to_string(),
            kind: None,
        }),
    }
}
