//! CLI command definitions and dispatch.

pub mod job;
pub mod migrate;
pub mod sweep;
pub mod worker;

use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use orchestrator_core::config::AppConfig;
use orchestrator_core::error::AppError;
use orchestrator_database::StoreManager;
use orchestrator_queue::QueueManager;

/// Agent orchestrator: submit, run, and reconcile agent jobs
#[derive(Debug, Parser)]
#[command(name = "orchestrator", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Run one reconciliation sweep and print the report
    Sweep,
    /// Execution loop management
    Worker(worker::WorkerArgs),
    /// Submit jobs and inspect their status
    Job(job::JobArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = load_config(&self.config)?;
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &config).await,
            Commands::Sweep => sweep::execute(&config, self.format).await,
            Commands::Worker(args) => worker::execute(args, &config, self.format).await,
            Commands::Job(args) => job::execute(args, &config, self.format).await,
        }
    }
}

/// Helper: load configuration from file and environment
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load_file(config_path)
}

/// Helper: connect the configured store
pub async fn open_store(config: &AppConfig) -> Result<StoreManager, AppError> {
    StoreManager::new(&config.database).await
}

/// Helper: connect the configured queue
pub async fn open_queue(config: &AppConfig) -> Result<QueueManager, AppError> {
    QueueManager::new(
        &config.queue,
        Duration::from_millis(config.worker.block_timeout_ms),
    )
    .await
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_job_submit_parses() {
        let cli = Cli::try_parse_from([
            "orchestrator",
            "--format",
            "json",
            "job",
            "submit",
            "sample-echo",
            "--payload",
            r#"{"task":"x"}"#,
        ])
        .expect("valid arguments");
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Job(job::JobArgs {
                command: job::JobCommand::Submit { agent_id, payload },
            }) => {
                assert_eq!(agent_id, "sample-echo");
                assert_eq!(payload, r#"{"task":"x"}"#);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
