use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use crosscheck_core::{QueryError, ResultRow, RowSource};

use crate::errors::classify_sqlx_error;

use super::rows::decode_row;

/// `RowSource` over a Postgres pool.
///
/// Every call runs in its own pooled connection inside a read-only
/// transaction that is always rolled back.
#[derive(Debug, Clone)]
pub struct PgRowSource {
    pool: PgPool,
}

impl PgRowSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_read_only(
        &self,
        sql: &str,
        timeout: Duration,
    ) -> Result<Vec<ResultRow>, QueryError> {
        let classify = |err| classify_sqlx_error(err, timeout);

        let mut tx = self.pool.begin().await.map_err(classify)?;
        sqlx::query("set transaction read only")
            .execute(&mut *tx)
            .await
            .map_err(classify)?;
        let statement_timeout = format!(
            "set local statement_timeout = {}",
            timeout.as_millis().max(1)
        );
        sqlx::query(&statement_timeout)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;

        let rows = sqlx::query(sql).fetch_all(&mut *tx).await.map_err(classify)?;
        tx.rollback().await.map_err(classify)?;

        rows.iter().map(decode_row).collect()
    }
}

#[async_trait]
impl RowSource for PgRowSource {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    async fn fetch_rows(&self, sql: &str, timeout: Duration) -> Result<Vec<ResultRow>, QueryError> {
        // client-side bound covers pool acquisition as well as the statement
        match tokio::time::timeout(timeout, self.fetch_read_only(sql, timeout)).await {
            Ok(result) => result,
            Err(_) => Err(QueryError::Timeout(timeout)),
        }
    }
}
