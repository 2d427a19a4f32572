use std::time::Duration;

use thiserror::Error;

/// Core error type for schema-model invariants.
#[derive(Debug, Error)]
pub enum Error {
    /// The schema model violates internal invariants.
    #[error("invalid schema model: {0}")]
    InvalidModel(String),
    /// Catch-all error for unexpected failures.
    #[error("other error: {0}")]
    Other(String),
}

/// Convenience alias for results returned by core helpers.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of one read-only statement sent through a `RowSource`.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("permission denied: {0}")]
    Permission(String),
    #[error("query timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("database error: {0}")]
    Database(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Failures of the external text-generation service and of parsing its output.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("no generation-service credential supplied")]
    MissingCredential,
    #[error("credential rejected: {0}")]
    InvalidCredential(String),
    #[error("generation service unreachable: {0}")]
    Unreachable(String),
    #[error("generation service rate limited: {0}")]
    RateLimited(String),
    #[error("malformed generation response: {0}")]
    MalformedResponse(String),
    #[error("no usable proposals in response ({dropped} dropped)")]
    NoUsableProposals { dropped: usize },
    #[error("generation request timed out after {0}s")]
    Timeout(u64),
    #[error("generation cancelled")]
    Cancelled,
}
