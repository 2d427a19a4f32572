use serde::{Deserialize, Serialize};

use crosscheck_core::{RankedRelation, RelationKind, ResultRow, TableInfo};

/// Everything the proposer needs to know about one focus table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisContext {
    /// Qualified `schema.table` of the focus table.
    pub focus_table: String,
    pub focus: TableInfo,
    /// Related tables in walk order: hop count, then importance.
    pub related: Vec<RelatedTable>,
    /// Ranked relations whose both ends are in the context.
    pub relations: Vec<RankedRelation>,
    pub samples: Vec<TableSample>,
    pub business_context: Option<String>,
    /// In `[0, 1]`; sizes the generation request only.
    pub complexity: f64,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl AnalysisContext {
    pub fn sampled_rows(&self) -> usize {
        self.samples.iter().map(|s| s.rows.len()).sum()
    }

    pub fn sample_for(&self, table: &str) -> Option<&TableSample> {
        self.samples.iter().find(|s| s.table == table)
    }

    /// Focus plus related tables, focus first.
    pub fn tables(&self) -> impl Iterator<Item = &TableInfo> {
        std::iter::once(&self.focus).chain(self.related.iter().map(|r| &r.info))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedTable {
    pub table: String,
    pub info: TableInfo,
    pub importance: u8,
    pub relation_type: RelationKind,
    pub hops: u8,
    pub join_condition: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSample {
    pub table: String,
    pub strategy: SampleStrategy,
    pub rows: Vec<ResultRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SampleStrategy {
    /// First, last and random rows ordered by a single-column key.
    Stratified { key: String },
    Uniform,
}
