//! Built-in runners and registry construction.

pub mod echo;
pub mod http;

use std::sync::Arc;

use orchestrator_core::AppResult;
use orchestrator_core::config::RunnersConfig;

use crate::registry::RunnerRegistry;

pub use echo::EchoRunner;
pub use http::HttpRunner;
pub use load_test::LoadTestRunner;

/// Build the registry from configuration: the built-in `sample-echo` and
/// `load-test` runners plus one [`HttpRunner`] per `runners.http` entry.
pub fn build_registry(config: &RunnersConfig) -> AppResult<RunnerRegistry> {
    let mut registry = RunnerRegistry::new();
    registry.register(Arc::new(EchoRunner::new()))?;
    registry.register(Arc::new(LoadTestRunner::new(&config.load_test)))?;
    for http in &config.http {
        registry.register(Arc::new(HttpRunner::new(http)?))?;
    }
    tracing::info!(agents = ?registry.agent_ids(), "Runner registry built");
    Ok(registry)
}
