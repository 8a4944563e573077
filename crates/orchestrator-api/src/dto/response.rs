//! Response DTOs.

use serde::{Deserialize, Serialize};

use orchestrator_core::JobId;

/// `POST /v1/run-agent` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunAgentResponse {
    /// Id of the accepted job.
    pub job_id: JobId,
}

/// `GET /healthz` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `true` while the process serves requests.
    pub ok: bool,
}

/// `GET /readyz` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Whether both backends answered.
    pub ok: bool,
    /// Job store reachable.
    pub database: bool,
    /// Work queue reachable.
    pub queue: bool,
}
