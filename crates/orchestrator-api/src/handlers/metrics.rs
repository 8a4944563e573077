//! Prometheus exporter for queue backlog and job counts.

use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use prometheus::{Encoder, IntGaugeVec, Opts, Registry, TextEncoder};

use orchestrator_core::AppResult;
use orchestrator_core::error::AppError;
use orchestrator_entity::job::JobStatus;
use orchestrator_worker::status::{OrchestratorSnapshot, snapshot};

use crate::state::AppState;

/// GET /metrics
///
/// Gauges are read fresh on every scrape. Any failure is answered with
/// `500 exporter_error <message>` so the scrape shows up as down.
pub async fn metrics(State(state): State<AppState>) -> Response {
    let rendered = match snapshot(state.store.as_ref(), state.queue.as_ref(), None).await {
        Ok(snap) => render(&snap),
        Err(e) => Err(e),
    };

    match rendered {
        Ok((content_type, body)) => ([(CONTENT_TYPE, content_type)], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e.chain(), "Metrics export failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(CONTENT_TYPE, "text/plain; charset=utf-8".to_string())],
                format!("exporter_error {}\n", e.message),
            )
                .into_response()
        }
    }
}

/// Render a snapshot in the text exposition format.
pub fn render(snap: &OrchestratorSnapshot) -> AppResult<(String, String)> {
    let registry = Registry::new();
    let stream = &snap.stream;

    let length = gauge(
        &registry,
        "orchestrator_stream_length",
        "Entries retained in the job stream",
        &["stream"],
    )?;
    length
        .with_label_values(&[stream.stream.as_str()])
        .set(clamp(stream.length));

    let lag = gauge(
        &registry,
        "orchestrator_stream_group_lag",
        "Entries not yet delivered to the consumer group",
        &["stream", "group"],
    )?;
    lag.with_label_values(&[stream.stream.as_str(), stream.group.as_str()])
        .set(clamp(stream.lag.unwrap_or(0)));

    let pending = gauge(
        &registry,
        "orchestrator_stream_group_pending",
        "Entries delivered to the consumer group but not acknowledged",
        &["stream", "group"],
    )?;
    pending
        .with_label_values(&[stream.stream.as_str(), stream.group.as_str()])
        .set(clamp(stream.pending));

    let jobs = gauge(&registry, "orchestrator_jobs", "Jobs by status", &["status"])?;
    for status in JobStatus::ALL {
        jobs.with_label_values(&[status.as_str()])
            .set(clamp(snap.jobs.get(status)));
    }

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&registry.gather(), &mut buffer)
        .map_err(|e| AppError::internal(format!("Failed to encode metrics: {}", e)))?;
    let body = String::from_utf8(buffer)
        .map_err(|e| AppError::internal(format!("Metrics are not UTF-8: {}", e)))?;

    Ok((encoder.format_type().to_string(), body))
}

fn gauge(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> AppResult<IntGaugeVec> {
    let gauge = IntGaugeVec::new(Opts::new(name, help), labels)
        .map_err(|e| AppError::internal(format!("Invalid gauge {}: {}", name, e)))?;
    registry
        .register(Box::new(gauge.clone()))
        .map_err(|e| AppError::internal(format!("Failed to register {}: {}", name, e)))?;
    Ok(gauge)
}

fn clamp(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use orchestrator_database::JobCounts;
    use orchestrator_entity::queue::StreamStats;

    use super::*;

    fn sample<'a>(body: &'a str, name: &str) -> Option<&'a str> {
        body.lines()
            .find(|line| line.starts_with(&format!("{name}{{")))
            .and_then(|line| line.rsplit(' ').next())
    }

    #[test]
    fn test_render_exposes_all_gauges() {
        let snap = OrchestratorSnapshot {
            stream: StreamStats {
                stream: "agent-jobs".into(),
                group: "workers".into(),
                length: 12,
                lag: Some(3),
                pending: 1,
                group_exists: true,
            },
            jobs: JobCounts {
                queued: 3,
                running: 1,
                succeeded: 7,
                failed: 1,
            },
            consumer_pending: None,
        };

        let (content_type, body) = render(&snap).unwrap();
        assert!(content_type.starts_with("text/plain"));
        assert_eq!(sample(&body, "orchestrator_stream_length"), Some("12"));
        assert_eq!(sample(&body, "orchestrator_stream_group_lag"), Some("3"));
        assert_eq!(sample(&body, "orchestrator_stream_group_pending"), Some("1"));
        assert!(body.contains("orchestrator_jobs{status=\"SUCCEEDED\"} 7"));
        assert!(body.contains("# TYPE orchestrator_jobs gauge"));
    }

    #[test]
    fn test_unknown_lag_renders_as_zero() {
        let snap = OrchestratorSnapshot {
            stream: StreamStats {
                stream: "s".into(),
                group: "g".into(),
                ..StreamStats::default()
            },
            jobs: JobCounts::default(),
            consumer_pending: None,
        };
        let (_, body) = render(&snap).unwrap();
        assert_eq!(sample(&body, "orchestrator_stream_group_lag"), Some("0"));
    }
}
