use std::collections::BTreeSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crosscheck_core::{RelationGraph, RowSource, SchemaModel, TableInfo};

use crate::complexity::{complexity_score, relation_diversity};
use crate::context::{AnalysisContext, RelatedTable, SampleStrategy, TableSample};
use crate::error::ContextError;
use crate::options::CollectorOptions;
use crate::sampling::{dedupe_by_key, plan_sample};

/// Builds an `AnalysisContext` around one focus table.
pub struct ContextCollector {
    rows: Arc<dyn RowSource>,
    options: CollectorOptions,
}

impl ContextCollector {
    pub fn new(rows: Arc<dyn RowSource>, options: CollectorOptions) -> Self {
        Self { rows, options }
    }

    pub fn options(&self) -> &CollectorOptions {
        &self.options
    }

    pub async fn collect(
        &self,
        model: &SchemaModel,
        focus: &str,
        business_context: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<AnalysisContext, ContextError> {
        let focus_info = resolve_focus(model, focus)?;
        let focus_table = focus_info.qualified_name();

        let graph = RelationGraph::from_relations(&model.ranked_relations);
        let related: Vec<RelatedTable> = graph
            .walk(
                &focus_table,
                self.options.max_hops,
                self.options.max_related_tables,
            )
            .into_iter()
            .filter_map(|hit| {
                let info = model.table(&hit.table)?.clone();
                Some(RelatedTable {
                    join_condition: hit.via.join_condition(),
                    importance: hit.via.importance,
                    relation_type: hit.via.kind,
                    hops: hit.hops,
                    table: hit.table,
                    info,
                })
            })
            .collect();

        let members: BTreeSet<&str> = std::iter::once(focus_table.as_str())
            .chain(related.iter().map(|r| r.table.as_str()))
            .collect();
        let relations: Vec<_> = model
            .ranked_relations
            .iter()
            .filter(|r| {
                members.contains(r.source_table.as_str()) && members.contains(r.target_table.as_str())
            })
            .cloned()
            .collect();

        let mut warnings = Vec::new();
        let to_sample: Vec<&TableInfo> = std::iter::once(focus_info)
            .chain(related.iter().map(|r| &r.info))
            .collect();
        let samples = self.sample_tables(&to_sample, cancel, &mut warnings).await?;

        let sampled_rows: usize = samples.iter().map(|s| s.rows.len()).sum();
        let complexity = complexity_score(
            related.len(),
            self.options.max_related_tables,
            sampled_rows,
            self.options.max_total_rows,
            relation_diversity(&relations),
        );

        info!(
            event = "context_collected",
            focus = %focus_table,
            related = related.len(),
            relations = relations.len(),
            sampled_rows,
            complexity,
            warnings = warnings.len()
        );

        Ok(AnalysisContext {
            focus_table,
            focus: focus_info.clone(),
            related,
            relations,
            samples,
            business_context: business_context
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string),
            complexity,
            warnings,
        })
    }

    async fn sample_tables(
        &self,
        tables: &[&TableInfo],
        cancel: &CancellationToken,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<TableSample>, ContextError> {
        let mut samples = Vec::new();
        let mut remaining = self.options.max_total_rows;

        for table in tables {
            if cancel.is_cancelled() {
                return Err(ContextError::Cancelled);
            }
            let limit = self.options.rows_per_table.min(remaining);
            if limit == 0 {
                break;
            }

            let plan = plan_sample(table, limit, self.options.large_table_rows);
            let qualified = table.qualified_name();
            let fetched = tokio::select! {
                _ = cancel.cancelled() => return Err(ContextError::Cancelled),
                result = self.rows.fetch_rows(&plan.sql, self.options.sample_timeout) => result,
            };

            match fetched {
                Ok(rows) => {
                    let rows = match &plan.strategy {
                        SampleStrategy::Stratified { key } => dedupe_by_key(rows, key, limit),
                        SampleStrategy::Uniform => rows.into_iter().take(limit).collect(),
                    };
                    remaining -= rows.len();
                    samples.push(TableSample {
                        table: qualified,
                        strategy: plan.strategy,
                        rows,
                    });
                }
                Err(err) => {
                    warn!(event = "sample_failed", table = %qualified, error = %err);
                    warnings.push(format!("sample of {qualified} failed: {err}"));
                }
            }
        }

        Ok(samples)
    }
}

/// Resolve `name` as `schema.table`, or as a bare name that is unique or
/// present in `public`.
pub fn resolve_focus<'a>(model: &'a SchemaModel, name: &str) -> Result<&'a TableInfo, ContextError> {
    let name = name.trim();
    let matches = model.find_tables(name);
    match matches.as_slice() {
        [] => Err(ContextError::FocusTableNotFound(name.to_string())),
        [only] => Ok(*only),
        _ => model
            .resolve_table(name)
            .ok_or_else(|| ContextError::AmbiguousFocusTable {
                name: name.to_string(),
                candidates: matches.iter().map(|t| t.qualified_name()).collect(),
            }),
    }
}
