use std::future::Future;
use std::time::{Duration, Instant};

use sqlx::PgPool;
use tracing::info;

use crosscheck_core::SchemaModel;

use crate::adapter::Adapter;
use crate::assemble::build_model;
use crate::errors::DiscoveryError;
use crate::inference::infer_with_timeout;
use crate::options::DiscoveryOptions;

mod mapper;
mod queries;
mod rows;
mod source;

pub use rows::decode_row;
pub use source::PgRowSource;

/// Adapter for PostgreSQL databases.
#[derive(Debug, Clone)]
pub struct PostgresAdapter {
    pool: PgPool,
}

impl PostgresAdapter {
    /// Create a new adapter using a pre-configured pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A `RowSource` sharing this adapter's pool.
    pub fn row_source(&self) -> PgRowSource {
        PgRowSource::new(self.pool.clone())
    }
}

#[async_trait::async_trait]
impl Adapter for PostgresAdapter {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    async fn discover(&self, opts: &DiscoveryOptions) -> Result<SchemaModel, DiscoveryError> {
        discover(&self.pool, opts).await
    }
}

/// Discover Postgres with default options.
pub async fn discover_postgres(pool: &PgPool) -> Result<SchemaModel, DiscoveryError> {
    discover(pool, &DiscoveryOptions::default()).await
}

/// Discover a Postgres database according to the provided options.
pub async fn discover(
    pool: &PgPool,
    opts: &DiscoveryOptions,
) -> Result<SchemaModel, DiscoveryError> {
    let started = Instant::now();
    let limit = opts.query_timeout;

    let database = bounded("database", limit, queries::fetch_database_name(pool)).await?;
    let schemas = mapper::filter_schemas(
        bounded("schemas", limit, queries::list_schemas(pool)).await?,
        opts,
    );
    let raw_tables = bounded("tables", limit, queries::list_tables(pool, &schemas)).await?;
    let raw_columns = bounded("columns", limit, queries::list_columns(pool, &schemas)).await?;
    let raw_fks = bounded(
        "foreign_keys",
        limit,
        queries::list_foreign_keys(pool, &schemas),
    )
    .await?;

    let tables = mapper::map_tables(raw_tables, raw_columns, opts);
    let declared = mapper::map_declared_relations(raw_fks, &tables);
    let implicit = infer_with_timeout(
        tables.clone(),
        declared.clone(),
        opts.inference.clone(),
        opts.detectors.clone(),
    )
    .await;

    let model = build_model("postgres", Some(database), tables, declared, implicit)?;
    info!(
        event = "discovery_finished",
        schemas = schemas.len(),
        tables = model.tables.len(),
        declared = model.declared_relations.len(),
        implicit = model.implicit_relations.len(),
        duration_ms = started.elapsed().as_millis() as u64
    );
    Ok(model)
}

async fn bounded<T, F>(stage: &'static str, limit: Duration, fut: F) -> Result<T, DiscoveryError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(DiscoveryError::from),
        Err(_) => Err(DiscoveryError::Timeout {
            stage,
            seconds: limit.as_secs(),
        }),
    }
}
