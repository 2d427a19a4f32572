use std::time::Duration;
use std::{env, fs};

use anyhow::{Context, Result};
use crosscheck_core::{RelationKind, RowSource, ScalarValue};
use crosscheck_introspect::{Adapter, DiscoveryOptions, PostgresAdapter};
use sqlx::{PgPool, postgres::PgPoolOptions};

const FIXTURE: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../fixtures/sql/postgres/001_schema.sql"
);

fn database_url() -> Option<String> {
    env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .ok()
}

async fn reset_fixture(pool: &PgPool) -> Result<()> {
    let script = fs::read_to_string(FIXTURE).with_context(|| format!("reading {FIXTURE}"))?;
    for statement in script.split(';') {
        let sql = statement.trim();
        if sql.is_empty() {
            continue;
        }
        sqlx::query(sql)
            .execute(pool)
            .await
            .with_context(|| format!("executing fixture statement: {sql}"))?;
    }
    Ok(())
}

#[tokio::test]
async fn discovers_declared_and_implicit_relations() -> Result<()> {
    let Some(url) = database_url() else {
        eprintln!("skipping: set TEST_DATABASE_URL or DATABASE_URL");
        return Ok(());
    };
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&url)
        .await
        .context("connecting to Postgres")?;
    reset_fixture(&pool).await?;

    let adapter = PostgresAdapter::new(pool.clone());
    let opts = DiscoveryOptions {
        schemas: Some(vec!["crosscheck_it".to_string()]),
        ..DiscoveryOptions::default()
    };
    let model = adapter.discover(&opts).await?;

    assert_eq!(model.engine, "postgres");
    assert_eq!(model.tables.len(), 4);
    assert_eq!(model.declared_relations.len(), 1);

    let first = &model.ranked_relations[0];
    assert_eq!(first.kind, RelationKind::Declared);
    assert_eq!(first.source_table, "crosscheck_it.orders");
    assert_eq!(first.target_table, "crosscheck_it.customers");

    let invoice = model
        .implicit_relations
        .iter()
        .find(|r| r.source_table == "invoices" && r.source_column == "client_id")
        .context("implicit invoices.client_id relation")?;
    assert_eq!(invoice.target_table, "clients");
    assert!(invoice.confidence >= 0.7);

    for table in &model.tables {
        assert!((0.0..=100.0).contains(&table.quality_score));
    }

    let again = adapter.discover(&opts).await?;
    assert_eq!(serde_json::to_value(&again)?, serde_json::to_value(&model)?);

    let rows = adapter
        .row_source()
        .fetch_rows(
            "select count(*) as orphaned_records from crosscheck_it.invoices i \
             left join crosscheck_it.clients c on c.id = i.client_id where c.id is null",
            Duration::from_secs(10),
        )
        .await?;
    assert_eq!(rows[0].get("orphaned_records"), Some(&ScalarValue::Int(1)));

    let write = adapter
        .row_source()
        .fetch_rows(
            "delete from crosscheck_it.invoices returning id",
            Duration::from_secs(10),
        )
        .await;
    assert!(write.is_err());

    let remaining: i64 = sqlx::query_scalar("select count(*) from crosscheck_it.invoices")
        .fetch_one(&pool)
        .await?;
    assert_eq!(remaining, 3);

    Ok(())
}
