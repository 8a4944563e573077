//! Work queue configuration.

use serde::{Deserialize, Serialize};

/// Work queue (stream) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Queue backend: `"redis"` or `"memory"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Stream key jobs are appended to.
    #[serde(default = "default_stream_key")]
    pub stream_key: String,
    /// Consumer group shared by execution loops.
    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,
    /// Maximum stream length; older entries are evicted on append.
    #[serde(default = "default_max_len")]
    pub max_len: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            redis_url: default_redis_url(),
            stream_key: default_stream_key(),
            consumer_group: default_consumer_group(),
            max_len: default_max_len(),
        }
    }
}

fn default_provider() -> String {
    "redis".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379/0".to_string()
}

fn default_stream_key() -> String {
    "agent-jobs".to_string()
}

fn default_consumer_group() -> String {
    "workers".to_string()
}

fn default_max_len() -> usize {
    10_000
}
