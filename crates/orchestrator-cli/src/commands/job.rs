//! Job submission and lookup commands.

use clap::{Args, Subcommand};
use serde_json::Value;

use crate::output::{self, OutputFormat, Row};
use orchestrator_core::JobId;
use orchestrator_core::config::AppConfig;
use orchestrator_core::error::AppError;
use orchestrator_entity::job::JobStatusView;
use orchestrator_worker::JobGateway;

/// Arguments for job commands
#[derive(Debug, Args)]
pub struct JobArgs {
    /// Job subcommand
    #[command(subcommand)]
    pub command: JobCommand,
}

/// Job subcommands
#[derive(Debug, Subcommand)]
pub enum JobCommand {
    /// Submit a job through the enqueue gateway
    Submit {
        /// Runner to execute the job
        agent_id: String,
        /// JSON object payload
        #[arg(short, long, default_value = "{}")]
        payload: String,
    },
    /// Show a job's status
    Get {
        /// Job id
        job_id: String,
    },
}

/// Execute job commands
pub async fn execute(args: &JobArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    match &args.command {
        JobCommand::Submit { agent_id, payload } => {
            let payload = parse_payload(payload)?;
            let store = super::open_store(config).await?;
            let queue = super::open_queue(config).await?;
            let gateway = JobGateway::new(store.store(), queue.queue());

            let result = gateway.submit(agent_id, payload).await;
            store.close().await;
            let job_id = result?;

            match format {
                OutputFormat::Table => {
                    output::print_success(&format!("Job queued for '{}' (id: {})", agent_id, job_id))
                }
                OutputFormat::Json => {
                    output::print_item(&serde_json::json!({ "job_id": job_id }), &[], format)
                }
            }
            Ok(())
        }
        JobCommand::Get { job_id } => {
            let job_id: JobId = job_id
                .parse()
                .map_err(|_| AppError::not_found(format!("Job '{}' not found", job_id)))?;

            let store = super::open_store(config).await?;
            let queue = super::open_queue(config).await?;
            let gateway = JobGateway::new(store.store(), queue.queue());
            let result = gateway.get_status(job_id).await;
            store.close().await;

            let view = result?
                .ok_or_else(|| AppError::not_found(format!("Job '{}' not found", job_id)))?;
            output::print_item(&view, &view_rows(&view), format);
            Ok(())
        }
    }
}

fn parse_payload(raw: &str) -> Result<Value, AppError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| AppError::validation(format!("Invalid JSON payload: {}", e)))?;
    if !value.is_object() {
        return Err(AppError::validation("Payload must be a JSON object"));
    }
    Ok(value)
}

fn view_rows(view: &JobStatusView) -> Vec<Row> {
    let mut rows = vec![
        Row::new("Job id", view.job_id),
        Row::new("Agent", &view.agent_id),
        Row::new("Status", view.status),
    ];
    if let Some(result) = &view.result {
        rows.push(Row::new("Result", result));
    }
    if let Some(error) = &view.error {
        rows.push(Row::new("Error", error));
    }
    rows
}
