use serde::{Deserialize, Serialize};

/// Complete schema model for one database, built fresh per discovery call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaModel {
    /// Contract version for this model format.
    pub model_version: String,
    /// Database engine identifier (e.g. `postgres`).
    pub engine: String,
    /// Database name when available.
    pub database: Option<String>,
    /// Tables in deterministic `schema.table` order.
    pub tables: Vec<TableInfo>,
    /// Foreign keys declared in the catalog.
    pub declared_relations: Vec<DeclaredRelation>,
    /// Relationships inferred by heuristics.
    pub implicit_relations: Vec<ImplicitRelation>,
    /// Declared and implicit relations merged and ranked by importance.
    pub ranked_relations: Vec<RankedRelation>,
}

impl SchemaModel {
    /// Look up a table by its qualified `schema.table` name.
    pub fn table(&self, qualified: &str) -> Option<&TableInfo> {
        self.tables
            .iter()
            .find(|table| table.qualified_name() == qualified)
    }

    /// All tables matching a qualified or bare name.
    pub fn find_tables(&self, name: &str) -> Vec<&TableInfo> {
        if let Some(table) = self.table(name) {
            return vec![table];
        }
        self.tables
            .iter()
            .filter(|table| table.name == name)
            .collect()
    }

    /// Resolve a qualified or bare name to a single table, preferring `public`
    /// when a bare name exists in several schemas.
    pub fn resolve_table(&self, name: &str) -> Option<&TableInfo> {
        let matches = self.find_tables(name);
        match matches.len() {
            0 => None,
            1 => matches.into_iter().next(),
            _ => matches.into_iter().find(|table| table.schema == "public"),
        }
    }

    /// Ranked relations with `table` on either end.
    pub fn relations_touching(&self, table: &str) -> Vec<&RankedRelation> {
        self.ranked_relations
            .iter()
            .filter(|relation| relation.involves(table))
            .collect()
    }

    /// Ranked relations connecting two tables, in either direction.
    pub fn relations_between(&self, left: &str, right: &str) -> Vec<&RankedRelation> {
        self.ranked_relations
            .iter()
            .filter(|relation| {
                (relation.source_table == left && relation.target_table == right)
                    || (relation.source_table == right && relation.target_table == left)
            })
            .collect()
    }
}

/// Table-level metadata plus its computed quality score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableInfo {
    pub schema: String,
    pub name: String,
    pub table_type: TableKind,
    pub column_count: usize,
    /// Planner estimate (`reltuples`); `-1` when never analyzed.
    pub estimated_rows: i64,
    pub size_bytes: i64,
    pub has_primary_key: bool,
    pub quality_score: f64,
    pub quality_breakdown: QualityBreakdown,
    pub columns: Vec<ColumnInfo>,
}

impl TableInfo {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn primary_key_columns(&self) -> Vec<&ColumnInfo> {
        self.columns
            .iter()
            .filter(|column| column.is_primary_key)
            .collect()
    }

    /// The primary key column when the key is a single column.
    pub fn single_primary_key(&self) -> Option<&ColumnInfo> {
        match self.primary_key_columns().as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

/// Kind of table represented in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Table,
    PartitionedTable,
    View,
    MaterializedView,
    ForeignTable,
    Other(String),
}

/// Column metadata with planner statistics when available.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    /// Formatted declared type (e.g. `character varying(255)`).
    pub data_type: String,
    pub is_nullable: bool,
    pub default: Option<String>,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
    /// `pg_stats.n_distinct`: positive values are counts, negative values are
    /// a fraction of the row count.
    pub distinct_estimate: Option<f64>,
    pub null_fraction: Option<f64>,
}

impl ColumnInfo {
    pub fn has_statistics(&self) -> bool {
        self.distinct_estimate.is_some() || self.null_fraction.is_some()
    }
}

/// Named sub-scores behind `TableInfo::quality_score`, each in `[0, 100]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QualityBreakdown {
    pub primary_key: f64,
    pub non_null: f64,
    pub statistics: f64,
    pub foreign_keys: f64,
    pub type_appropriateness: f64,
    pub total: f64,
}

/// Foreign key declared in the catalog, one entry per column pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeclaredRelation {
    pub constraint_name: String,
    pub source_schema: String,
    pub source_table: String,
    pub source_column: String,
    pub target_schema: String,
    pub target_table: String,
    pub target_column: String,
}

impl DeclaredRelation {
    pub fn source_qualified(&self) -> String {
        format!("{}.{}", self.source_schema, self.source_table)
    }

    pub fn target_qualified(&self) -> String {
        format!("{}.{}", self.target_schema, self.target_table)
    }
}

/// Relationship inferred by a heuristic rather than declared.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImplicitRelation {
    pub source_schema: String,
    pub source_table: String,
    pub source_column: String,
    pub target_schema: String,
    pub target_table: String,
    pub target_column: String,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub detection_method: DetectionMethod,
    pub evidence: String,
}

impl ImplicitRelation {
    pub fn source_qualified(&self) -> String {
        format!("{}.{}", self.source_schema, self.source_table)
    }

    pub fn target_qualified(&self) -> String {
        format!("{}.{}", self.target_schema, self.target_table)
    }
}

/// Heuristic that produced an implicit relation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectionMethod {
    NamingPattern,
    ColumnNameMatch,
    SchemaPrefix,
    Statistical,
    JoinPattern,
}

impl DetectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMethod::NamingPattern => "NAMING_PATTERN",
            DetectionMethod::ColumnNameMatch => "COLUMN_NAME_MATCH",
            DetectionMethod::SchemaPrefix => "SCHEMA_PREFIX",
            DetectionMethod::Statistical => "STATISTICAL",
            DetectionMethod::JoinPattern => "JOIN_PATTERN",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Declared,
    Implicit,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Declared => "declared",
            RelationKind::Implicit => "implicit",
        }
    }
}

/// Kind of check a relation makes possible.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationOpportunity {
    ReferentialIntegrity,
    OrphanDetection,
    CardinalityCheck,
    DataConsistency,
}

impl ValidationOpportunity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationOpportunity::ReferentialIntegrity => "referential-integrity",
            ValidationOpportunity::OrphanDetection => "orphan-detection",
            ValidationOpportunity::CardinalityCheck => "cardinality-check",
            ValidationOpportunity::DataConsistency => "data-consistency",
        }
    }
}

/// Declared or implicit relation with its downstream importance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedRelation {
    pub kind: RelationKind,
    /// Qualified `schema.table` of the referencing side.
    pub source_table: String,
    pub source_column: String,
    /// Qualified `schema.table` of the referenced side.
    pub target_table: String,
    pub target_column: String,
    /// 10 for declared relations, `round(confidence * 8) + 2` otherwise.
    pub importance: u8,
    pub confidence: f64,
    pub opportunities: Vec<ValidationOpportunity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

impl RankedRelation {
    pub fn join_condition(&self) -> String {
        format!(
            "{}.{} = {}.{}",
            self.source_table, self.source_column, self.target_table, self.target_column
        )
    }

    pub fn involves(&self, table: &str) -> bool {
        self.source_table == table || self.target_table == table
    }

    /// The table on the other end of the relation from `table`.
    pub fn other_end(&self, table: &str) -> Option<&str> {
        if self.source_table == table {
            Some(self.target_table.as_str())
        } else if self.target_table == table {
            Some(self.source_table.as_str())
        } else {
            None
        }
    }
}
