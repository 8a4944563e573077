//! One-shot reconciliation sweep, the entry point for an external cron.

use crate::output::{self, OutputFormat, Row};
use orchestrator_core::config::AppConfig;
use orchestrator_core::error::AppError;
use orchestrator_worker::{SweepReport, Sweeper};

/// Execute the sweep command
pub async fn execute(config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let store = super::open_store(config).await?;
    let sweeper = Sweeper::new(store.store(), config.sweeper.clone());
    let result = sweeper.run_once().await;
    store.close().await;

    let report = result?;
    output::print_item(&report, &report_rows(&report), format);
    Ok(())
}

fn report_rows(report: &SweepReport) -> Vec<Row> {
    let ids = |ids: &[orchestrator_core::JobId]| {
        if ids.is_empty() {
            "-".to_string()
        } else {
            ids.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
        }
    };

    vec![
        Row::new("Timed out", report.timed_out.len()),
        Row::new("Timed out ids", ids(&report.timed_out)),
        Row::new("Expired", report.expired.len()),
        Row::new("Expired ids", ids(&report.expired)),
        Row::new("Deleted", report.deleted),
    ]
}
