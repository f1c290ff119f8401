//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes
//! - Response types

pub mod routes;

use std::sync::Arc;

use axum::Router;
use stowage_core::artifact::AccessUrlSource;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Artifact access URL lookup.
    pub artifacts: Arc<dyn AccessUrlSource>,
}

impl AppState {
    /// Create application state.
    #[must_use]
    pub fn new(artifacts: Arc<dyn AccessUrlSource>) -> Self {
        Self { artifacts }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
