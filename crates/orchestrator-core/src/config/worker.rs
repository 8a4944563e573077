//! Execution loop configuration.

use serde::{Deserialize, Serialize};

/// Execution loop (queue consumer) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the execution loop runs in this process.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Consumer identity inside the consumer group.
    #[serde(default = "default_consumer_name")]
    pub consumer_name: String,
    /// In-process concurrency. Must be 1; scale out with more consumer identities.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Bounded wait of a single queue poll, in milliseconds.
    #[serde(default = "default_block_timeout")]
    pub block_timeout_ms: u64,
    /// Pause after a failed queue poll, in milliseconds.
    #[serde(default = "default_error_backoff")]
    pub error_backoff_ms: u64,
    /// Fail jobs whose payload cannot be decoded instead of running them with `{}`.
    #[serde(default)]
    pub strict_payload_decoding: bool,
    /// Only move a job to RUNNING when it is currently QUEUED.
    #[serde(default)]
    pub guard_running_transition: bool,
    /// How long shutdown waits for the in-flight job, in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            consumer_name: default_consumer_name(),
            concurrency: default_concurrency(),
            block_timeout_ms: default_block_timeout(),
            error_backoff_ms: default_error_backoff(),
            strict_payload_decoding: false,
            guard_running_transition: false,
            shutdown_timeout_seconds: default_shutdown_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_consumer_name() -> String {
    "worker-1".to_string()
}

fn default_concurrency() -> usize {
    1
}

fn default_block_timeout() -> u64 {
    5000
}

fn default_error_backoff() -> u64 {
    1000
}

fn default_shutdown_timeout() -> u64 {
    30
}
