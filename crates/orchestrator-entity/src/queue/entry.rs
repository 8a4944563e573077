//! Queue entry wire format.
//!
//! An entry is a flat map of string fields: `job_id`, `agent_id`, and
//! `payload` (the payload serialized as a JSON string). The queue assigns
//! each appended entry a monotonically increasing entry id.

use std::collections::HashMap;

use orchestrator_core::JobId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Field carrying the job identifier.
pub const FIELD_JOB_ID: &str = "job_id";
/// Field carrying the runner selector.
pub const FIELD_AGENT_ID: &str = "agent_id";
/// Field carrying the JSON-encoded payload.
pub const FIELD_PAYLOAD: &str = "payload";

/// An entry to append to the work queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Job identifier correlating the entry with its record.
    pub job_id: JobId,
    /// Target runner.
    pub agent_id: String,
    /// Payload serialized as a JSON string.
    pub payload: String,
}

impl QueueEntry {
    /// Build an entry, serializing the payload.
    pub fn new(job_id: JobId, agent_id: impl Into<String>, payload: &serde_json::Value) -> Self {
        Self {
            job_id,
            agent_id: agent_id.into(),
            payload: payload.to_string(),
        }
    }

    /// Field/value pairs in wire order.
    pub fn fields(&self) -> [(&'static str, String); 3] {
        [
            (FIELD_JOB_ID, self.job_id.to_string()),
            (FIELD_AGENT_ID, self.agent_id.clone()),
            (FIELD_PAYLOAD, self.payload.clone()),
        ]
    }
}

/// An entry that cannot be correlated with a job record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedEntry {
    /// The entry has no `job_id` field.
    #[error("entry has no job_id field")]
    MissingJobId,
    /// The `job_id` field is not a UUID.
    #[error("entry job_id '{0}' is not a valid identifier")]
    InvalidJobId(String),
}

/// An entry delivered to a consumer and not yet acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Queue-assigned entry id, used for acknowledgement.
    pub entry_id: String,
    /// Raw entry fields.
    pub fields: HashMap<String, String>,
}

impl Delivery {
    /// Create a delivery from raw fields.
    pub fn new(entry_id: impl Into<String>, fields: HashMap<String, String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            fields,
        }
    }

    /// Parse the job identifier.
    pub fn job_id(&self) -> Result<JobId, MalformedEntry> {
        let raw = self
            .fields
            .get(FIELD_JOB_ID)
            .ok_or(MalformedEntry::MissingJobId)?;
        raw.trim()
            .parse()
            .map_err(|_| MalformedEntry::InvalidJobId(raw.clone()))
    }

    /// The runner selector, empty when the field is absent.
    pub fn agent_id(&self) -> &str {
        self.fields
            .get(FIELD_AGENT_ID)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Decode the payload. A missing field decodes as `{}`; the error is the
    /// decoder's message.
    pub fn payload(&self) -> Result<serde_json::Value, String> {
        match self.fields.get(FIELD_PAYLOAD) {
            None => Ok(serde_json::Value::Object(serde_json::Map::new())),
            Some(raw) => serde_json::from_str(raw).map_err(|e| e.to_string()),
        }
    }
}

impl From<(String, &QueueEntry)> for Delivery {
    fn from((entry_id, entry): (String, &QueueEntry)) -> Self {
        let fields = entry
            .fields()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        Self { entry_id, fields }
    }
}
