use std::collections::BTreeSet;

use crosscheck_core::{ResultRow, TableInfo, TableKind, qualified_ident, quote_ident};

use crate::context::SampleStrategy;

/// A sample query and the strategy it implements.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePlan {
    pub sql: String,
    pub strategy: SampleStrategy,
}

/// Build the sample statement for `table`, returning at most `limit` rows.
pub fn plan_sample(table: &TableInfo, limit: usize, large_table_rows: i64) -> SamplePlan {
    let relation = qualified_ident(&table.schema, &table.name);

    if let Some(key) = table.single_primary_key() {
        let key_ident = quote_ident(&key.name);
        let first = limit.div_ceil(3);
        let last = (limit - first).div_ceil(2);
        let random = limit - first - last;
        let sql = format!(
            "(select * from {relation} order by {key_ident} asc limit {first}) \
             union all (select * from {relation} order by {key_ident} desc limit {last}) \
             union all (select * from {relation} order by random() limit {random})"
        );
        return SamplePlan {
            sql,
            strategy: SampleStrategy::Stratified {
                key: key.name.clone(),
            },
        };
    }

    let sql = match table.table_type {
        TableKind::View | TableKind::ForeignTable => {
            format!("select * from {relation} limit {limit}")
        }
        _ if table.estimated_rows > large_table_rows => {
            let percent = (limit as f64 * 20.0 / table.estimated_rows as f64 * 100.0)
                .clamp(0.01, 100.0);
            format!("select * from {relation} tablesample system ({percent:.4}) limit {limit}")
        }
        _ => format!("select * from {relation} order by random() limit {limit}"),
    };
    SamplePlan {
        sql,
        strategy: SampleStrategy::Uniform,
    }
}

/// Drop rows repeating a key value (small tables overlap across buckets)
/// and cap at `limit`.
pub fn dedupe_by_key(rows: Vec<ResultRow>, key: &str, limit: usize) -> Vec<ResultRow> {
    let mut seen = BTreeSet::new();
    rows.into_iter()
        .filter(|row| match row.get(key) {
            Some(value) if !value.is_null() => seen.insert(value.to_string()),
            _ => true,
        })
        .take(limit)
        .collect()
}
