use std::collections::{BTreeMap, BTreeSet};

use crosscheck_core::{ColumnInfo, DeclaredRelation, QualityBreakdown, TableInfo, TableKind};

use crate::options::DiscoveryOptions;

use super::queries::{RawColumn, RawForeignKey, RawTable};

pub fn filter_schemas(raw: Vec<String>, opts: &DiscoveryOptions) -> Vec<String> {
    raw.into_iter()
        .filter(|schema| {
            let is_system = schema.starts_with("pg_") || schema == "information_schema";
            match &opts.schemas {
                Some(list) => list.iter().any(|item| item == schema),
                None => opts.include_system_schemas || !is_system,
            }
        })
        .collect()
}

pub fn relkind_to_table_kind(relkind: i8) -> TableKind {
    match relkind as u8 {
        b'r' => TableKind::Table,
        b'p' => TableKind::PartitionedTable,
        b'v' => TableKind::View,
        b'm' => TableKind::MaterializedView,
        b'f' => TableKind::ForeignTable,
        other => TableKind::Other((other as char).to_string()),
    }
}

fn table_kind_enabled(kind: &TableKind, opts: &DiscoveryOptions) -> bool {
    match kind {
        TableKind::View | TableKind::MaterializedView => opts.include_views,
        _ => true,
    }
}

/// Join raw tables and columns into `TableInfo` values, dropping views when
/// they are disabled.
pub fn map_tables(
    raw_tables: Vec<RawTable>,
    raw_columns: Vec<RawColumn>,
    opts: &DiscoveryOptions,
) -> Vec<TableInfo> {
    let mut columns_by_table: BTreeMap<(String, String), Vec<ColumnInfo>> = BTreeMap::new();
    for column in raw_columns {
        columns_by_table
            .entry((column.schema.clone(), column.table.clone()))
            .or_default()
            .push(map_column(column));
    }

    raw_tables
        .into_iter()
        .filter_map(|table| {
            let kind = relkind_to_table_kind(table.relkind);
            if !table_kind_enabled(&kind, opts) {
                return None;
            }
            let columns = columns_by_table
                .remove(&(table.schema.clone(), table.name.clone()))
                .unwrap_or_default();
            Some(TableInfo {
                schema: table.schema,
                name: table.name,
                table_type: kind,
                column_count: columns.len(),
                estimated_rows: table.estimated_rows,
                size_bytes: table.size_bytes,
                has_primary_key: columns.iter().any(|c| c.is_primary_key),
                quality_score: 0.0,
                quality_breakdown: QualityBreakdown::default(),
                columns,
            })
        })
        .collect()
}

fn map_column(raw: RawColumn) -> ColumnInfo {
    ColumnInfo {
        name: raw.name,
        data_type: raw.data_type,
        is_nullable: raw.is_nullable,
        default: raw.default,
        is_primary_key: raw.is_primary_key,
        is_foreign_key: false,
        distinct_estimate: raw.n_distinct,
        null_fraction: raw.null_frac,
    }
}

/// Keep only foreign keys whose both ends survived table filtering.
pub fn map_declared_relations(
    raw: Vec<RawForeignKey>,
    tables: &[TableInfo],
) -> Vec<DeclaredRelation> {
    let known: BTreeSet<(&str, &str)> = tables
        .iter()
        .map(|t| (t.schema.as_str(), t.name.as_str()))
        .collect();

    raw.into_iter()
        .filter(|fk| {
            known.contains(&(fk.source_schema.as_str(), fk.source_table.as_str()))
                && known.contains(&(fk.target_schema.as_str(), fk.target_table.as_str()))
        })
        .map(|fk| DeclaredRelation {
            constraint_name: fk.constraint_name,
            source_schema: fk.source_schema,
            source_table: fk.source_table,
            source_column: fk.source_column,
            target_schema: fk.target_schema,
            target_table: fk.target_table,
            target_column: fk.target_column,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_table(schema: &str, name: &str, relkind: u8) -> RawTable {
        RawTable {
            schema: schema.to_string(),
            name: name.to_string(),
            relkind: relkind as i8,
            estimated_rows: 10,
            size_bytes: 8192,
        }
    }

    fn raw_column(table: &str, name: &str, pk: bool) -> RawColumn {
        RawColumn {
            schema: "public".to_string(),
            table: table.to_string(),
            name: name.to_string(),
            data_type: "integer".to_string(),
            is_nullable: !pk,
            default: None,
            is_primary_key: pk,
            n_distinct: None,
            null_frac: Some(0.0),
        }
    }

    #[test]
    fn system_schemas_are_hidden_unless_requested() {
        let raw = vec![
            "information_schema".to_string(),
            "pg_catalog".to_string(),
            "public".to_string(),
        ];
        let opts = DiscoveryOptions::default();
        assert_eq!(filter_schemas(raw.clone(), &opts), vec!["public".to_string()]);

        let opts = DiscoveryOptions {
            include_system_schemas: true,
            ..DiscoveryOptions::default()
        };
        assert_eq!(filter_schemas(raw, &opts).len(), 3);
    }

    #[test]
    fn views_are_dropped_when_disabled() {
        let opts = DiscoveryOptions {
            include_views: false,
            ..DiscoveryOptions::default()
        };
        let tables = map_tables(
            vec![raw_table("public", "orders", b'r'), raw_table("public", "order_totals", b'v')],
            vec![raw_column("orders", "id", true), raw_column("order_totals", "id", false)],
            &opts,
        );
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "orders");
        assert!(tables[0].has_primary_key);
        assert_eq!(tables[0].column_count, 1);
    }

    #[test]
    fn foreign_keys_to_filtered_tables_are_dropped() {
        let tables = map_tables(
            vec![raw_table("public", "orders", b'r')],
            vec![raw_column("orders", "id", true)],
            &DiscoveryOptions::default(),
        );
        let fk = RawForeignKey {
            constraint_name: "orders_customer_id_fkey".to_string(),
            source_schema: "public".to_string(),
            source_table: "orders".to_string(),
            source_column: "customer_id".to_string(),
            target_schema: "public".to_string(),
            target_table: "customers".to_string(),
            target_column: "id".to_string(),
        };
        assert!(map_declared_relations(vec![fk], &tables).is_empty());
    }
}
