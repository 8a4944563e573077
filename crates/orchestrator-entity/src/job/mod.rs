//! Job record domain entities.

pub mod error;
pub mod model;
pub mod status;

pub use error::{FailureReason, JobError};
pub use model::{Job, JobStatusView, NewJob};
pub use status::JobStatus;
