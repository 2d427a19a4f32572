use std::time::Duration;

use async_trait::async_trait;

use crate::error::QueryError;
use crate::rows::ResultRow;

/// Read-only query capability against the target database.
///
/// Implementations must run each call on its own session so one failing
/// statement cannot affect another, and must never open a write transaction.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Returns the engine identifier (e.g. `postgres`).
    fn engine(&self) -> &'static str;

    /// Run one statement and return its rows, bounded by `timeout`.
    async fn fetch_rows(&self, sql: &str, timeout: Duration) -> Result<Vec<ResultRow>, QueryError>;
}
