//! Mint Service
//!
//! REST API for starting mint runs and polling their progress

use anyhow::{Context, Result};
use mint_pipeline::build_orchestrator;
use mint_service::{create_router, AppState, ServiceConfig};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mint_service=debug,mint_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Mint Service");

    let config = ServiceConfig::from_env().context("Failed to load configuration")?;
    info!("Models: {}", config.pipeline.models.names().collect::<Vec<_>>().join(", "));
    info!("Storage: {:?}", config.pipeline.storage);
    info!(
        "Chain: {}",
        if config.pipeline.chain.mock_mode {
            "mock"
        } else {
            "JSON-RPC"
        }
    );

    let orchestrator =
        build_orchestrator(&config.pipeline).context("Failed to initialize mint pipeline")?;

    let app = create_router(AppState::new(orchestrator));

    let listener = TcpListener::bind(&config.api_address())
        .await
        .with_context(|| format!("Failed to bind to {}", config.api_address()))?;

    info!("Mint Service listening on {}", config.api_address());
    info!("Health check: http://{}/health", config.api_address());

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
