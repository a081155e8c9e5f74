//! Health check handler.

use axum::{Json, extract::State, http::StatusCode};
use devgate_core::repository::AccountRepository;
use serde_json::{Value, json};

use crate::state::AppState;

/// GET /health
///
/// 200 when storage answers a round trip, 503 otherwise.
pub async fn health<R: AccountRepository + 'static>(
    State(state): State<AppState<R>>,
) -> (StatusCode, Json<Value>) {
    match state.service.health().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "db": "disconnected" })),
            )
        }
    }
}
