//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! optional TOML files and the process environment. Every section has a
//! `Default` impl, so an empty environment yields a runnable configuration.

pub mod app;
pub mod database;
pub mod logging;
pub mod queue;
pub mod runners;
pub mod sweeper;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use self::app::ServerConfig;
pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;
pub use self::queue::QueueConfig;
pub use self::runners::{HttpRunnerConfig, LoadTestConfig, RunnersConfig};
pub use self::sweeper::SweeperConfig;
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Bare environment variables understood for compatibility with existing
/// deployments, mapped to their configuration keys.
const PLAIN_ENV_OVERRIDES: &[(&str, &str)] = &[
    ("DATABASE_URL", "database.url"),
    ("REDIS_URL", "queue.redis_url"),
    ("STREAM_KEY", "queue.stream_key"),
    ("CONSUMER_GROUP", "queue.consumer_group"),
    ("CONSUMER_NAME", "worker.consumer_name"),
    ("JOB_TIMEOUT_SECONDS", "sweeper.job_timeout_seconds"),
    ("QUEUED_EXPIRE_SECONDS", "sweeper.queued_expire_seconds"),
    ("RETENTION_DAYS", "sweeper.retention_days"),
];

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Job store settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Work queue settings.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Execution loop settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Reconciliation sweeper settings.
    #[serde(default)]
    pub sweeper: SweeperConfig,
    /// Task runner registry settings.
    #[serde(default)]
    pub runners: RunnersConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration for the given environment name.
    ///
    /// Merges `config/default.toml`, `config/{env}.toml` (both optional),
    /// environment variables prefixed with `ORCHESTRATOR__`, and the plain
    /// variables listed in [`PLAIN_ENV_OVERRIDES`].
    pub fn load(env: &str) -> Result<Self, AppError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false));
        Self::finish(builder)
    }

    /// Load configuration from a single (optional) file plus the environment.
    pub fn load_file(path: &str) -> Result<Self, AppError> {
        let builder =
            config::Config::builder().add_source(config::File::with_name(path).required(false));
        Self::finish(builder)
    }

    /// Parse configuration from a TOML document without consulting the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let parsed: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        parsed.validate()?;
        Ok(parsed)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, AppError> {
        let mut builder = builder.add_source(
            config::Environment::with_prefix("ORCHESTRATOR")
                .separator("__")
                .try_parsing(true),
        );

        for (var, key) in PLAIN_ENV_OVERRIDES {
            builder = builder.set_override_option(*key, std::env::var(var).ok())?;
        }

        let config = builder
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let parsed: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Reject configurations the coordination core cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.worker.concurrency != 1 {
            return Err(AppError::configuration(format!(
                "worker.concurrency must be 1 (got {}); run more consumer identities to scale out",
                self.worker.concurrency
            )));
        }
        if self.worker.consumer_name.trim().is_empty() {
            return Err(AppError::configuration("worker.consumer_name must not be empty"));
        }
        if self.worker.block_timeout_ms == 0 {
            return Err(AppError::configuration(
                "worker.block_timeout_ms must be greater than zero",
            ));
        }
        if self.queue.stream_key.trim().is_empty() || self.queue.consumer_group.trim().is_empty() {
            return Err(AppError::configuration(
                "queue.stream_key and queue.consumer_group must not be empty",
            ));
        }
        if self.queue.max_len == 0 {
            return Err(AppError::configuration("queue.max_len must be greater than zero"));
        }
        if !matches!(self.database.provider.as_str(), "postgres" | "memory") {
            return Err(AppError::configuration(format!(
                "Unknown database provider: '{}'. Supported: postgres, memory",
                self.database.provider
            )));
        }
        if !matches!(self.queue.provider.as_str(), "redis" | "memory") {
            return Err(AppError::configuration(format!(
                "Unknown queue provider: '{}'. Supported: redis, memory",
                self.queue.provider
            )));
        }
        if self.sweeper.job_timeout_seconds == 0
            || self.sweeper.queued_expire_seconds == 0
            || self.sweeper.retention_days == 0
        {
            return Err(AppError::configuration(
                "sweeper thresholds must be greater than zero",
            ));
        }
        let load_test = &self.runners.load_test;
        if load_test.min_sleep_ms > load_test.max_sleep_ms {
            return Err(AppError::configuration(format!(
                "runners.load_test.min_sleep_ms ({}) exceeds max_sleep_ms ({})",
                load_test.min_sleep_ms, load_test.max_sleep_ms
            )));
        }
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            return Err(AppError::configuration(format!(
                "Unknown logging format: '{}'. Supported: json, pretty",
                self.logging.format
            )));
        }
        Ok(())
    }
}
