//! Agent orchestrator server.
//!
//! Main entry point that wires all crates together: the HTTP API, the
//! execution loop, and the in-process sweep scheduler.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use orchestrator_api::{AppState, build_router};
use orchestrator_core::config::AppConfig;
use orchestrator_core::error::AppError;
use orchestrator_database::StoreManager;
use orchestrator_queue::QueueManager;
use orchestrator_worker::runners::build_registry;
use orchestrator_worker::{SweepScheduler, Sweeper, WorkerRunner};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e.chain(), "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
///
/// `ORCHESTRATOR_CONFIG` names a single file; otherwise `config/default.toml`
/// and `config/{ORCHESTRATOR_ENV}.toml` are merged.
fn load_configuration() -> Result<AppConfig, AppError> {
    match std::env::var("ORCHESTRATOR_CONFIG") {
        Ok(path) => AppConfig::load_file(&path),
        Err(_) => {
            let env =
                std::env::var("ORCHESTRATOR_ENV").unwrap_or_else(|_| "development".to_string());
            AppConfig::load(&env)
        }
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_current_span(false)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting agent orchestrator v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Job store (+ migrations) ─────────────────────────
    let store = StoreManager::new(&config.database).await?;

    // ── Step 2: Work queue ───────────────────────────────────────
    let queue = QueueManager::new(
        &config.queue,
        Duration::from_millis(config.worker.block_timeout_ms),
    )
    .await?;

    // ── Step 3: Runner registry ──────────────────────────────────
    let registry = Arc::new(build_registry(&config.runners)?);

    // ── Step 4: Shutdown channel & execution loop ────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker_handle = if config.worker.enabled {
        let worker_runner = WorkerRunner::new(
            store.store(),
            queue.queue(),
            Arc::clone(&registry),
            config.worker.clone(),
        );
        let worker_cancel = shutdown_rx.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = worker_runner.run(worker_cancel).await {
                tracing::error!(error = %e, "Execution loop exited with error");
            }
        });
        tracing::info!(consumer = %config.worker.consumer_name, "Execution loop started");
        Some(handle)
    } else {
        tracing::info!("Execution loop disabled");
        None
    };

    // ── Step 5: Sweep scheduler ──────────────────────────────────
    let mut scheduler = if config.sweeper.enabled {
        let sweeper = Arc::new(Sweeper::new(store.store(), config.sweeper.clone()));
        let scheduler = SweepScheduler::new(sweeper).await?;
        scheduler.register(&config.sweeper.schedule).await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Sweep scheduler disabled");
        None
    };

    // ── Step 6: HTTP server ──────────────────────────────────────
    let state = AppState::new(config.clone(), store.store(), queue.queue());
    let app = build_router(state);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!(address = %addr, "Orchestrator listening");

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let served = server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)));

    // ── Step 7: Wait for background tasks ────────────────────────
    if let Some(scheduler) = scheduler.as_mut() {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!(error = %e, "Sweep scheduler did not shut down cleanly");
        }
    }

    if let Some(handle) = worker_handle {
        let grace = Duration::from_secs(config.worker.shutdown_timeout_seconds);
        tracing::info!(grace_seconds = grace.as_secs(), "Waiting for the current job to finish");
        if tokio::time::timeout(grace, handle).await.is_err() {
            tracing::warn!("Execution loop did not stop within the grace period");
        }
    }

    store.close().await;
    served?;

    tracing::info!("Agent orchestrator shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
