use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::schema::SchemaModel;

/// Validate internal consistency of a schema model.
///
/// This checks:
/// - duplicate tables/columns
/// - declared and implicit relations point at known tables and columns
/// - implicit confidence stays within `[0, 1]`
/// - no implicit pair duplicates a declared pair
/// - every ranked relation references tables present in the model
pub fn validate_schema_model(model: &SchemaModel) -> Result<()> {
    let mut catalog: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();

    for table in &model.tables {
        let key = table.qualified_name();
        if catalog.contains_key(&key) {
            return Err(Error::InvalidModel(format!("duplicate table name: {key}")));
        }

        let mut columns = BTreeSet::new();
        for column in &table.columns {
            if !columns.insert(column.name.as_str()) {
                return Err(Error::InvalidModel(format!(
                    "duplicate column name: {key}.{}",
                    column.name
                )));
            }
        }
        catalog.insert(key, columns);
    }

    let check_column = |table: &str, column: &str, what: &str| -> Result<()> {
        let columns = catalog.get(table).ok_or_else(|| {
            Error::InvalidModel(format!("{what} references unknown table: {table}"))
        })?;
        if !columns.contains(column) {
            return Err(Error::InvalidModel(format!(
                "{what} references unknown column: {table}.{column}"
            )));
        }
        Ok(())
    };

    let mut declared_pairs = BTreeSet::new();
    for relation in &model.declared_relations {
        let source = relation.source_qualified();
        let target = relation.target_qualified();
        check_column(&source, &relation.source_column, "declared relation")?;
        check_column(&target, &relation.target_column, "declared relation")?;
        declared_pairs.insert((source, target));
    }

    for relation in &model.implicit_relations {
        let source = relation.source_qualified();
        let target = relation.target_qualified();
        if !(0.0..=1.0).contains(&relation.confidence) {
            return Err(Error::InvalidModel(format!(
                "implicit relation {source} -> {target} has confidence {} outside [0, 1]",
                relation.confidence
            )));
        }
        check_column(&source, &relation.source_column, "implicit relation")?;
        check_column(&target, &relation.target_column, "implicit relation")?;
        if declared_pairs.contains(&(source.clone(), target.clone())) {
            return Err(Error::InvalidModel(format!(
                "implicit relation duplicates declared pair: {source} -> {target}"
            )));
        }
    }

    for relation in &model.ranked_relations {
        for table in [&relation.source_table, &relation.target_table] {
            if !catalog.contains_key(table.as_str()) {
                return Err(Error::InvalidModel(format!(
                    "ranked relation references unknown table: {table}"
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        ColumnInfo, DeclaredRelation, DetectionMethod, ImplicitRelation, QualityBreakdown,
        RankedRelation, RelationKind, TableInfo, TableKind,
    };

    fn column(name: &str) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            data_type: "integer".to_string(),
            is_nullable: false,
            default: None,
            is_primary_key: name == "id",
            is_foreign_key: false,
            distinct_estimate: None,
            null_fraction: None,
        }
    }

    fn table(name: &str, columns: &[&str]) -> TableInfo {
        TableInfo {
            schema: "public".to_string(),
            name: name.to_string(),
            table_type: TableKind::Table,
            column_count: columns.len(),
            estimated_rows: 0,
            size_bytes: 0,
            has_primary_key: columns.contains(&"id"),
            quality_score: 0.0,
            quality_breakdown: QualityBreakdown::default(),
            columns: columns.iter().map(|name| column(name)).collect(),
        }
    }

    fn model() -> SchemaModel {
        SchemaModel {
            model_version: "0.1".to_string(),
            engine: "postgres".to_string(),
            database: None,
            tables: vec![
                table("customers", &["id"]),
                table("orders", &["id", "customer_id"]),
            ],
            declared_relations: vec![DeclaredRelation {
                constraint_name: "orders_customer_id_fkey".to_string(),
                source_schema: "public".to_string(),
                source_table: "orders".to_string(),
                source_column: "customer_id".to_string(),
                target_schema: "public".to_string(),
                target_table: "customers".to_string(),
                target_column: "id".to_string(),
            }],
            implicit_relations: Vec::new(),
            ranked_relations: Vec::new(),
        }
    }

    #[test]
    fn accepts_consistent_model() {
        assert!(validate_schema_model(&model()).is_ok());
    }

    #[test]
    fn rejects_implicit_duplicate_of_declared() {
        let mut model = model();
        model.implicit_relations.push(ImplicitRelation {
            source_schema: "public".to_string(),
            source_table: "orders".to_string(),
            source_column: "customer_id".to_string(),
            target_schema: "public".to_string(),
            target_table: "customers".to_string(),
            target_column: "id".to_string(),
            confidence: 0.9,
            detection_method: DetectionMethod::NamingPattern,
            evidence: String::new(),
        });
        let err = validate_schema_model(&model).unwrap_err();
        assert!(err.to_string().contains("duplicates declared pair"));
    }

    #[test]
    fn rejects_ranked_relation_to_unknown_table() {
        let mut model = model();
        model.ranked_relations.push(RankedRelation {
            kind: RelationKind::Implicit,
            source_table: "public.orders".to_string(),
            source_column: "customer_id".to_string(),
            target_table: "public.ghosts".to_string(),
            target_column: "id".to_string(),
            importance: 5,
            confidence: 0.4,
            opportunities: Vec::new(),
            evidence: None,
        });
        assert!(validate_schema_model(&model).is_err());
    }
}
