//! Stream introspection snapshot.

use serde::{Deserialize, Serialize};

/// Backlog numbers for one stream and consumer group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStats {
    /// Stream key.
    pub stream: String,
    /// Consumer group name.
    pub group: String,
    /// Entries currently retained in the stream.
    pub length: u64,
    /// Entries not yet delivered to the group. `None` when the server cannot tell.
    pub lag: Option<u64>,
    /// Entries delivered to the group but not acknowledged.
    pub pending: u64,
    /// Whether the consumer group exists yet.
    pub group_exists: bool,
}
