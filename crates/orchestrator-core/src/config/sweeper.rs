//! Reconciliation sweeper configuration.

use serde::{Deserialize, Serialize};

/// Reconciliation sweeper thresholds and schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Whether the in-process sweep scheduler runs.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Six-field cron expression (with seconds) for the sweep schedule.
    #[serde(default = "default_schedule")]
    pub schedule: String,
    /// RUNNING jobs started longer ago than this are failed with `timeout`.
    #[serde(default = "default_job_timeout")]
    pub job_timeout_seconds: u64,
    /// QUEUED jobs created longer ago than this are failed with `expired`.
    #[serde(default = "default_queued_expire")]
    pub queued_expire_seconds: u64,
    /// Terminal jobs finished longer ago than this are deleted.
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            schedule: default_schedule(),
            job_timeout_seconds: default_job_timeout(),
            queued_expire_seconds: default_queued_expire(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_schedule() -> String {
    "0 */5 * * * *".to_string()
}

fn default_job_timeout() -> u64 {
    1800
}

fn default_queued_expire() -> u64 {
    86_400
}

fn default_retention_days() -> u64 {
    7
}
