//! # orchestrator-api
//!
//! HTTP surface of the agent orchestrator built on Axum.
//!
//! Provides job submission and status endpoints, liveness and readiness
//! probes, the Prometheus exporter, request logging, and error mapping.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
