//! Execution loop CLI commands.

use std::sync::Arc;

use clap::{Args, Subcommand};
use tokio::sync::watch;

use crate::output::{self, OutputFormat, Row};
use orchestrator_core::config::AppConfig;
use orchestrator_core::error::AppError;
use orchestrator_worker::runners::build_registry;
use orchestrator_worker::status::{OrchestratorSnapshot, snapshot};
use orchestrator_worker::WorkerRunner;

/// Arguments for worker commands
#[derive(Debug, Args)]
pub struct WorkerArgs {
    /// Worker subcommand
    #[command(subcommand)]
    pub command: WorkerCommand,
}

/// Worker subcommands
#[derive(Debug, Subcommand)]
pub enum WorkerCommand {
    /// Run a standalone consumer until Ctrl-C
    Run {
        /// Override the configured consumer identity
        #[arg(long)]
        consumer: Option<String>,
    },
    /// Show stream backlog and job counts
    Status,
}

/// Execute worker commands
pub async fn execute(
    args: &WorkerArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        WorkerCommand::Run { consumer } => run(config, consumer.as_deref()).await,
        WorkerCommand::Status => {
            let store = super::open_store(config).await?;
            let queue = super::open_queue(config).await?;
            let snap = snapshot(
                store.store().as_ref(),
                queue.queue().as_ref(),
                Some(&config.worker.consumer_name),
            )
            .await;
            store.close().await;

            let snap = snap?;
            output::print_item(&snap, &status_rows(&snap, config), format);
            Ok(())
        }
    }
}

async fn run(config: &AppConfig, consumer: Option<&str>) -> Result<(), AppError> {
    let mut worker_config = config.worker.clone();
    if let Some(name) = consumer {
        worker_config.consumer_name = name.to_string();
    }

    let store = super::open_store(config).await?;
    let queue = super::open_queue(config).await?;
    let registry = Arc::new(build_registry(&config.runners)?);

    let runner = WorkerRunner::new(store.store(), queue.queue(), registry, worker_config);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown requested, finishing current job"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
        }
        let _ = shutdown_tx.send(true);
    });

    output::print_success(&format!(
        "Consuming '{}' as '{}' (Ctrl-C to stop)",
        config.queue.stream_key,
        runner.consumer_name()
    ));

    let result = runner.run(shutdown_rx).await;
    store.close().await;
    result
}

fn status_rows(snap: &OrchestratorSnapshot, config: &AppConfig) -> Vec<Row> {
    let stream = &snap.stream;
    let lag = stream
        .lag
        .map(|lag| lag.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let mut rows = vec![
        Row::new("Stream", &stream.stream),
        Row::new("Group", &stream.group),
        Row::new("Group exists", stream.group_exists),
        Row::new("Length", stream.length),
        Row::new("Lag", lag),
        Row::new("Pending (group)", stream.pending),
    ];
    if let Some(pending) = snap.consumer_pending {
        rows.push(Row::new(
            &format!("Pending ({})", config.worker.consumer_name),
            pending,
        ));
    }
    rows.extend([
        Row::new("Queued", snap.jobs.queued),
        Row::new("Running", snap.jobs.running),
        Row::new("Succeeded", snap.jobs.succeeded),
        Row::new("Failed", snap.jobs.failed),
    ]);
    rows
}

#[cfg(test)]
mod tests {
    use orchestrator_database::JobCounts;
    use orchestrator_entity::queue::StreamStats;

    use super::*;

    #[test]
    fn test_status_rows_include_consumer_pending() {
        let snap = OrchestratorSnapshot {
            stream: StreamStats {
                stream: "agent-jobs".into(),
                group: "workers".into(),
                length: 5,
                lag: None,
                pending: 2,
                group_exists: true,
            },
            jobs: JobCounts {
                queued: 3,
                ..JobCounts::default()
            },
            consumer_pending: Some(2),
        };
        let rows = status_rows(&snap, &AppConfig::default());
        let lag = rows.iter().find(|r| r.field == "Lag").expect("lag row");
        assert_eq!(lag.value, "unknown");
        assert!(rows.iter().any(|r| r.field == "Pending (worker-1)" && r.value == "2"));
        assert!(rows.iter().any(|r| r.field == "Queued" && r.value == "3"));
    }
}
