//! Stowage API Server
//!
//! Serves access URLs for stored recordings and debug screenshots.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stowage_api::{AppState, create_router};
use stowage_core::artifact::ArtifactStorageService;
use stowage_db::{ReferenceRepository, connect_with};
use stowage_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stowage=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load()?;

    // Connect to database
    let db = connect_with(&config.database).await?;
    info!("Connected to database");

    // Build adapters once; unusable providers are logged and left out
    let storage = ArtifactStorageService::from_settings(
        &config.storage,
        Arc::new(ReferenceRepository::new(db)),
    );
    info!(
        mode = storage.mode().as_str(),
        providers = ?storage.configured_providers(),
        "Artifact storage configured"
    );

    // Create router
    let app = create_router(AppState::new(Arc::new(storage)));

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Ctrl-C received, shutting down");
        })
        .await?;

    Ok(())
}
