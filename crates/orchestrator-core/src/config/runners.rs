//! Runner registry configuration.

use serde::{Deserialize, Serialize};

/// Built-in and configured task runners.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnersConfig {
    /// Agent used when a submission omits `agent_id`.
    #[serde(default = "default_agent_id")]
    pub default_agent_id: String,
    /// Synthetic load-test runner settings.
    #[serde(default)]
    pub load_test: LoadTestConfig,
    /// Runners that delegate to an HTTP endpoint.
    #[serde(default)]
    pub http: Vec<HttpRunnerConfig>,
}

impl Default for RunnersConfig {
    fn default() -> Self {
        Self {
            default_agent_id: default_agent_id(),
            load_test: LoadTestConfig::default(),
            http: Vec::new(),
        }
    }
}

/// Sleep range of the `load-test` runner when the payload does not pin one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadTestConfig {
    /// Lower bound of the randomized sleep, in milliseconds.
    #[serde(default = "default_min_sleep")]
    pub min_sleep_ms: u64,
    /// Upper bound of the randomized sleep, in milliseconds.
    #[serde(default = "default_max_sleep")]
    pub max_sleep_ms: u64,
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self {
            min_sleep_ms: default_min_sleep(),
            max_sleep_ms: default_max_sleep(),
        }
    }
}

/// An agent served by a remote HTTP endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpRunnerConfig {
    /// Agent identifier the runner is registered under.
    pub agent_id: String,
    /// Endpoint receiving `POST {payload, context}`.
    pub url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u64,
}

fn default_agent_id() -> String {
    "sample-echo".to_string()
}

fn default_min_sleep() -> u64 {
    100
}

fn default_max_sleep() -> u64 {
    2000
}

fn default_http_timeout() -> u64 {
    300
}
