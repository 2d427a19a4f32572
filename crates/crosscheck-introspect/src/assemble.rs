use std::collections::BTreeSet;

use crosscheck_core::{
    DeclaredRelation, ImplicitRelation, MODEL_VERSION, SchemaModel, TableInfo,
    validate_schema_model,
};

use crate::errors::DiscoveryError;
use crate::inference::infer_implicit_relations;
use crate::options::InferenceOptions;
use crate::quality::score_tables;
use crate::ranking::rank_relations;

/// Build a model from enumerated tables and declared relations, running the
/// built-in inference synchronously.
pub fn assemble_model(
    engine: &str,
    database: Option<String>,
    tables: Vec<TableInfo>,
    declared: Vec<DeclaredRelation>,
    opts: &InferenceOptions,
) -> Result<SchemaModel, DiscoveryError> {
    let implicit = infer_implicit_relations(&tables, &declared, opts);
    build_model(engine, database, tables, declared, implicit)
}

/// Mark foreign-key columns, score tables, rank relations and validate.
pub fn build_model(
    engine: &str,
    database: Option<String>,
    mut tables: Vec<TableInfo>,
    declared: Vec<DeclaredRelation>,
    implicit: Vec<ImplicitRelation>,
) -> Result<SchemaModel, DiscoveryError> {
    let fk_columns: BTreeSet<(String, String)> = declared
        .iter()
        .map(|r| (r.source_qualified(), r.source_column.clone()))
        .collect();
    for table in &mut tables {
        let qualified = table.qualified_name();
        for column in &mut table.columns {
            if fk_columns.contains(&(qualified.clone(), column.name.clone())) {
                column.is_foreign_key = true;
            }
        }
        table.column_count = table.columns.len();
        table.has_primary_key = table.columns.iter().any(|c| c.is_primary_key);
    }
    score_tables(&mut tables);
    tables.sort_by(|left, right| {
        left.schema
            .cmp(&right.schema)
            .then_with(|| left.name.cmp(&right.name))
    });

    let ranked_relations = rank_relations(&declared, &implicit);
    let model = SchemaModel {
        model_version: MODEL_VERSION.to_string(),
        engine: engine.to_string(),
        database,
        tables,
        declared_relations: declared,
        implicit_relations: implicit,
        ranked_relations,
    };
    validate_schema_model(&model)?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use crosscheck_core::{DetectionMethod, RelationKind};

    use super::*;
    use crate::testing::{declared, shop_tables};

    #[test]
    fn declared_relation_ranks_first_without_implicit_duplicate() {
        let model = assemble_model(
            "postgres",
            Some("shop".to_string()),
            shop_tables(),
            vec![declared("orders", "customer_id", "customers", "id")],
            &InferenceOptions::default(),
        )
        .expect("model");

        let first = &model.ranked_relations[0];
        assert_eq!(first.kind, RelationKind::Declared);
        assert_eq!(first.importance, 10);
        assert_eq!(first.source_table, "public.orders");
        assert!(
            model
                .implicit_relations
                .iter()
                .all(|r| !(r.source_table == "orders" && r.target_table == "customers"))
        );

        let orders = model.table("public.orders").expect("orders");
        assert!(orders.column("customer_id").expect("column").is_foreign_key);
        assert!(orders.quality_score > 0.0);
    }

    #[test]
    fn undeclared_plural_reference_is_ranked_implicit() {
        let model = assemble_model(
            "postgres",
            None,
            shop_tables(),
            Vec::new(),
            &InferenceOptions::default(),
        )
        .expect("model");

        let invoice = model
            .ranked_relations
            .iter()
            .find(|r| r.source_table == "public.invoices")
            .expect("invoice relation");
        assert_eq!(invoice.kind, RelationKind::Implicit);
        assert_eq!(invoice.target_table, "public.clients");
        assert!(invoice.confidence >= 0.7);
        assert_eq!(invoice.importance, 9);
        assert!(
            model
                .implicit_relations
                .iter()
                .any(|r| r.detection_method == DetectionMethod::NamingPattern)
        );
    }

    #[test]
    fn every_table_is_scored_within_bounds() {
        let model = assemble_model(
            "postgres",
            None,
            shop_tables(),
            Vec::new(),
            &InferenceOptions::default(),
        )
        .expect("model");
        for table in &model.tables {
            assert!((0.0..=100.0).contains(&table.quality_score));
            assert_eq!(table.quality_score, table.quality_breakdown.total);
        }
    }
}
