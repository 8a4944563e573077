//! Convenience result type alias for the orchestrator.

use crate::error::AppError;

/// A specialized `Result` type for orchestrator operations.
pub type AppResult<T> = Result<T, AppError>;
