use sqlx::{PgPool, Row};

pub async fn fetch_database_name(pool: &PgPool) -> Result<String, sqlx::Error> {
    sqlx::query_scalar::<_, String>("select current_database()")
        .fetch_one(pool)
        .await
}

pub async fn list_schemas(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("select nspname::text from pg_namespace order by nspname")
        .fetch_all(pool)
        .await
}

pub struct RawTable {
    pub schema: String,
    pub name: String,
    pub relkind: i8,
    pub estimated_rows: i64,
    pub size_bytes: i64,
}

pub async fn list_tables(pool: &PgPool, schemas: &[String]) -> Result<Vec<RawTable>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        select
          n.nspname::text as schema_name,
          c.relname::text as table_name,
          c.relkind as relkind,
          greatest(c.reltuples, -1)::bigint as estimated_rows,
          coalesce(pg_catalog.pg_total_relation_size(c.oid), 0)::bigint as size_bytes
        from pg_class c
        join pg_namespace n on n.oid = c.relnamespace
        where n.nspname::text = any($1)
          and c.relkind in ('r','p','v','m','f')
          and not c.relispartition
        order by n.nspname, c.relname
        "#,
    )
    .bind(schemas)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(RawTable {
                schema: row.try_get("schema_name")?,
                name: row.try_get("table_name")?,
                relkind: row.try_get("relkind")?,
                estimated_rows: row.try_get("estimated_rows")?,
                size_bytes: row.try_get("size_bytes")?,
            })
        })
        .collect()
}

pub struct RawColumn {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub default: Option<String>,
    pub is_primary_key: bool,
    pub n_distinct: Option<f64>,
    pub null_frac: Option<f64>,
}

pub async fn list_columns(
    pool: &PgPool,
    schemas: &[String],
) -> Result<Vec<RawColumn>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        select
          n.nspname::text as schema_name,
          c.relname::text as table_name,
          a.attname::text as column_name,
          pg_catalog.format_type(a.atttypid, a.atttypmod) as data_type,
          not a.attnotnull as is_nullable,
          pg_catalog.pg_get_expr(ad.adbin, ad.adrelid) as column_default,
          exists (
            select 1 from pg_constraint pk
            where pk.conrelid = c.oid and pk.contype = 'p' and a.attnum = any(pk.conkey)
          ) as is_primary_key,
          st.n_distinct::float8 as n_distinct,
          st.null_frac::float8 as null_frac
        from pg_attribute a
        join pg_class c on c.oid = a.attrelid
        join pg_namespace n on n.oid = c.relnamespace
        left join pg_attrdef ad on ad.adrelid = a.attrelid and ad.adnum = a.attnum
        left join lateral (
          select s.n_distinct, s.null_frac
          from pg_stats s
          where s.schemaname = n.nspname
            and s.tablename = c.relname
            and s.attname = a.attname
          order by s.inherited
          limit 1
        ) st on true
        where n.nspname::text = any($1)
          and c.relkind in ('r','p','v','m','f')
          and not c.relispartition
          and a.attnum > 0
          and not a.attisdropped
        order by n.nspname, c.relname, a.attnum
        "#,
    )
    .bind(schemas)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(RawColumn {
                schema: row.try_get("schema_name")?,
                table: row.try_get("table_name")?,
                name: row.try_get("column_name")?,
                data_type: row.try_get("data_type")?,
                is_nullable: row.try_get("is_nullable")?,
                default: row.try_get("column_default")?,
                is_primary_key: row.try_get("is_primary_key")?,
                n_distinct: row.try_get("n_distinct")?,
                null_frac: row.try_get("null_frac")?,
            })
        })
        .collect()
}

pub struct RawForeignKey {
    pub constraint_name: String,
    pub source_schema: String,
    pub source_table: String,
    pub source_column: String,
    pub target_schema: String,
    pub target_table: String,
    pub target_column: String,
}

/// One row per column pair of every foreign key whose ends both live in
/// `schemas`.
pub async fn list_foreign_keys(
    pool: &PgPool,
    schemas: &[String],
) -> Result<Vec<RawForeignKey>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        select
          con.conname::text as constraint_name,
          src_ns.nspname::text as source_schema,
          src.relname::text as source_table,
          src_att.attname::text as source_column,
          tgt_ns.nspname::text as target_schema,
          tgt.relname::text as target_table,
          tgt_att.attname::text as target_column
        from pg_constraint con
        join pg_class src on src.oid = con.conrelid
        join pg_namespace src_ns on src_ns.oid = src.relnamespace
        join pg_class tgt on tgt.oid = con.confrelid
        join pg_namespace tgt_ns on tgt_ns.oid = tgt.relnamespace
        cross join lateral unnest(con.conkey, con.confkey) as k(src_attnum, tgt_attnum)
        join pg_attribute src_att on src_att.attrelid = src.oid and src_att.attnum = k.src_attnum
        join pg_attribute tgt_att on tgt_att.attrelid = tgt.oid and tgt_att.attnum = k.tgt_attnum
        where con.contype = 'f'
          and con.conparentid = 0
          and src_ns.nspname::text = any($1)
          and tgt_ns.nspname::text = any($1)
        order by src_ns.nspname, src.relname, con.conname, src_att.attname
        "#,
    )
    .bind(schemas)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(RawForeignKey {
                constraint_name: row.try_get("constraint_name")?,
                source_schema: row.try_get("source_schema")?,
                source_table: row.try_get("source_table")?,
                source_column: row.try_get("source_column")?,
                target_schema: row.try_get("target_schema")?,
                target_table: row.try_get("target_table")?,
                target_column: row.try_get("target_column")?,
            })
        })
        .collect()
}
