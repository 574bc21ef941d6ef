//! Mint Service
//!
//! HTTP host for the mint orchestrator. Accepts one mint run at a time,
//! drives it in the background and exposes its progress for polling.

pub mod config;
pub mod handlers;
pub mod models;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::ServiceConfig;
pub use handlers::AppState;
pub use models::{FileBody, MintRequestBody, MintResponse, ModelsResponse, StatusResponse};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api/models", get(handlers::list_models_handler))
        .route("/api/mint", post(handlers::start_mint_handler))
        .route("/api/status", get(handlers::get_status_handler))
        .route("/api/preview", get(handlers::get_preview_handler))
        .with_state(shared_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
