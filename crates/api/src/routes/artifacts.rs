//! Artifact access routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use stowage_core::storage::AccessUrlResult;
use stowage_shared::{AppError, types::ArtifactId};
use tracing::debug;

use super::error_response;
use crate::AppState;

/// Creates the artifact routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/artifacts/{artifact_id}/access-url", get(get_access_url))
}

/// GET `/artifacts/{artifact_id}/access-url`
///
/// Always 200 for a well-formed id; `available` tells whether any provider
/// could serve the artifact.
async fn get_access_url(
    State(state): State<AppState>,
    Path(artifact_id): Path<String>,
) -> Response {
    let artifact_id = match artifact_id.parse::<ArtifactId>() {
        Ok(id) => id,
        Err(e) => {
            return error_response(&AppError::Validation(format!(
                "invalid artifact id '{artifact_id}': {e}"
            )));
        }
    };

    match state.artifacts.access_url(artifact_id).await {
        AccessUrlResult::Resolved { provider, url } => {
            debug!(artifact_id = %artifact_id, provider = %provider, "Serving access URL");
            Json(json!({
                "available": true,
                "url": url.url,
                "provider": provider,
                "expires_at": url.expires_at.map(|t| t.to_rfc3339()),
            }))
            .into_response()
        }
        AccessUrlResult::Unavailable => Json(json!({ "available": false })).into_response(),
    }
}
