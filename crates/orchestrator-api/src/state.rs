//! Application state shared across all handlers.

use std::sync::Arc;

use orchestrator_core::config::AppConfig;
use orchestrator_database::JobStore;
use orchestrator_queue::WorkQueue;
use orchestrator_worker::JobGateway;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Job store
    pub store: Arc<dyn JobStore>,
    /// Work queue
    pub queue: Arc<dyn WorkQueue>,
    /// Submission and status path over `store` and `queue`
    pub gateway: JobGateway,
}

impl AppState {
    /// Build the state from its backends.
    pub fn new(config: AppConfig, store: Arc<dyn JobStore>, queue: Arc<dyn WorkQueue>) -> Self {
        let gateway = JobGateway::new(Arc::clone(&store), Arc::clone(&queue));
        Self {
            config: Arc::new(config),
            store,
            queue,
            gateway,
        }
    }
}
