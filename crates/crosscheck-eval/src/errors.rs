use std::time::Duration;

use crosscheck_core::QueryError;
use thiserror::Error;

/// Failure of one execution unit. Always folded into an `error` outcome.
#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("statement exceeded {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("cancelled")]
    Cancelled,
    #[error("execution panicked: {0}")]
    Panicked(String),
    #[error("execution task failed: {0}")]
    TaskFailed(String),
}
