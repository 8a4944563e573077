//! Structured failure information stored on FAILED jobs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a job ended up FAILED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The runner returned an error.
    RunnerError,
    /// The runner panicked.
    RunnerPanic,
    /// No runner is registered for the job's `agent_id`.
    UnknownAgent,
    /// The runner returned something other than a JSON object.
    InvalidResult,
    /// The queued payload could not be decoded (strict decoding only).
    PayloadDecodeError,
    /// The job stayed RUNNING past the timeout threshold.
    Timeout,
    /// The job stayed QUEUED past the expiry threshold.
    Expired,
}

impl FailureReason {
    /// Return the reason as written into the error object.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RunnerError => "runner_error",
            Self::RunnerPanic => "runner_panic",
            Self::UnknownAgent => "unknown_agent",
            Self::InvalidResult => "invalid_result",
            Self::PayloadDecodeError => "payload_decode_error",
            Self::Timeout => "timeout",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `error` column of a FAILED job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobError {
    /// Human-readable failure message.
    pub message: String,
    /// Machine-readable failure category.
    pub reason: FailureReason,
    /// Full error chain, when one is available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
    /// Decode error of the queued payload, when the job ran with `{}` instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_decode_error: Option<String>,
}

impl JobError {
    /// Create an error object with no trace.
    pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            reason,
            trace: None,
            payload_decode_error: None,
        }
    }

    /// Attach the full error chain.
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    /// Record that the payload was replaced because it failed to decode.
    pub fn with_payload_decode_error(mut self, decode_error: Option<String>) -> Self {
        self.payload_decode_error = decode_error;
        self
    }

    /// Error written by the sweeper's timeout pass.
    pub fn timeout(threshold_seconds: u64) -> Self {
        Self::new(
            FailureReason::Timeout,
            format!("job exceeded the {threshold_seconds}s running timeout"),
        )
    }

    /// Error written by the sweeper's expiry pass.
    pub fn expired(threshold_seconds: u64) -> Self {
        Self::new(
            FailureReason::Expired,
            format!("job was not picked up within {threshold_seconds}s"),
        )
    }

    /// Serialize into the JSON stored in the `error` column.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({ "message": self.message, "reason": self.reason.as_str() })
        })
    }
}
