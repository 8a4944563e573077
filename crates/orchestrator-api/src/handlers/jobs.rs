//! Job submission and status handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use serde_json::Value;
use validator::Validate;

use orchestrator_core::JobId;
use orchestrator_core::error::AppError;
use orchestrator_entity::job::JobStatusView;

use crate::dto::request::RunAgentRequest;
use crate::dto::response::RunAgentResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// POST /v1/run-agent
pub async fn run_agent(
    State(state): State<AppState>,
    body: Result<Json<RunAgentRequest>, JsonRejection>,
) -> Result<Json<RunAgentResponse>, ApiError> {
    let Json(req) = body.map_err(|e| AppError::validation(e.body_text()))?;
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let agent_id = req.agent_id_or(&state.config.runners.default_agent_id);
    let job_id = state
        .gateway
        .submit(agent_id, Value::Object(req.payload.clone()))
        .await?;

    Ok(Json(RunAgentResponse { job_id }))
}

/// GET /v1/jobs/{job_id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusView>, ApiError> {
    let not_found = || AppError::not_found("job_id not found");

    let job_id: JobId = job_id.parse().map_err(|_| not_found())?;
    let view = state
        .gateway
        .get_status(job_id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(view))
}
