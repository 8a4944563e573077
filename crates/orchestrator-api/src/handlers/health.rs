//! Health check handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::dto::response::{HealthResponse, ReadinessResponse};
use crate::state::AppState;

/// GET /healthz
pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

/// GET /readyz
pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let (database, queue) = tokio::join!(state.store.health_check(), state.queue.health_check());
    let database = database.unwrap_or(false);
    let queue = queue.unwrap_or(false);
    let ok = database && queue;

    let status = if ok {
        StatusCode::OK
    } else {
        tracing::warn!(database, queue, "Readiness check failed");
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(ReadinessResponse { ok, database, queue }))
}
