use crosscheck_core::{ColumnInfo, DeclaredRelation, QualityBreakdown, TableInfo, TableKind};

pub fn column(name: &str, data_type: &str) -> ColumnInfo {
    ColumnInfo {
        name: name.to_string(),
        data_type: data_type.to_string(),
        is_nullable: true,
        default: None,
        is_primary_key: false,
        is_foreign_key: false,
        distinct_estimate: None,
        null_fraction: None,
    }
}

pub fn pk(name: &str, data_type: &str) -> ColumnInfo {
    ColumnInfo {
        is_nullable: false,
        is_primary_key: true,
        ..column(name, data_type)
    }
}

pub fn table(schema: &str, name: &str, columns: Vec<ColumnInfo>) -> TableInfo {
    TableInfo {
        schema: schema.to_string(),
        name: name.to_string(),
        table_type: TableKind::Table,
        column_count: columns.len(),
        estimated_rows: 100,
        size_bytes: 8192,
        has_primary_key: columns.iter().any(|c| c.is_primary_key),
        quality_score: 0.0,
        quality_breakdown: QualityBreakdown::default(),
        columns,
    }
}

pub fn declared(source: &str, column: &str, target: &str, target_column: &str) -> DeclaredRelation {
    DeclaredRelation {
        constraint_name: format!("{source}_{column}_fkey"),
        source_schema: "public".to_string(),
        source_table: source.to_string(),
        source_column: column.to_string(),
        target_schema: "public".to_string(),
        target_table: target.to_string(),
        target_column: target_column.to_string(),
    }
}

/// customers <- orders (declared), plus invoices.client_id -> clients.id
/// left undeclared.
pub fn shop_tables() -> Vec<TableInfo> {
    vec![
        table(
            "public",
            "customers",
            vec![pk("id", "integer"), column("email", "text")],
        ),
        table(
            "public",
            "orders",
            vec![
                pk("id", "integer"),
                column("customer_id", "integer"),
                column("created_at", "timestamp with time zone"),
            ],
        ),
        table(
            "public",
            "clients",
            vec![pk("id", "integer"), column("name", "text")],
        ),
        table(
            "public",
            "invoices",
            vec![
                pk("id", "bigint"),
                column("client_id", "integer"),
                column("total", "numeric(12,2)"),
            ],
        ),
    ]
}
