use std::time::Duration;

use thiserror::Error;

use crosscheck_core::QueryError;

/// Failures of schema discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("database unreachable: {0}")]
    ConnectionUnreachable(String),
    #[error("insufficient privileges: {0}")]
    InsufficientPrivileges(String),
    #[error("discovery stage '{stage}' timed out after {seconds}s")]
    Timeout { stage: &'static str, seconds: u64 },
    #[error("metadata query failed: {0}")]
    Query(String),
    #[error(transparent)]
    InvalidModel(#[from] crosscheck_core::Error),
}

const INSUFFICIENT_PRIVILEGE: &str = "42501";
const QUERY_CANCELED: &str = "57014";

impl From<sqlx::Error> for DiscoveryError {
    fn from(err: sqlx::Error) -> Self {
        match classify_sqlx_error(err, Duration::ZERO) {
            QueryError::Connection(message) => Self::ConnectionUnreachable(message),
            QueryError::Permission(message) => Self::InsufficientPrivileges(message),
            QueryError::Timeout(limit) => Self::Timeout {
                stage: "query",
                seconds: limit.as_secs(),
            },
            QueryError::Database(message) | QueryError::Decode(message) => Self::Query(message),
        }
    }
}

/// Map a driver error into the transport-neutral `QueryError` categories.
///
/// `limit` is reported when the server cancelled the statement on
/// `statement_timeout`.
pub fn classify_sqlx_error(err: sqlx::Error, limit: Duration) -> QueryError {
    match &err {
        sqlx::Error::Database(db) => {
            if db.code().as_deref() == Some(INSUFFICIENT_PRIVILEGE) {
                QueryError::Permission(db.message().to_string())
            } else if db.code().as_deref() == Some(QUERY_CANCELED) {
                QueryError::Timeout(limit)
            } else {
                QueryError::Database(db.message().to_string())
            }
        }
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Configuration(_) => QueryError::Connection(err.to_string()),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            QueryError::Decode(err.to_string())
        }
        _ => QueryError::Database(err.to_string()),
    }
}
