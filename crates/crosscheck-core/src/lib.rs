//! Core contracts shared by the crosscheck pipeline crates.
//!
//! This crate defines the schema model produced by discovery, the ordered
//! result-row shape every database-reading stage works with, validation
//! proposals, and the two capability traits (`RowSource`, `TextGenerator`)
//! that keep the pipeline stages independent of their network transports.

pub mod error;
pub mod generation;
pub mod graph;
pub mod ident;
pub mod proposal;
pub mod redaction;
pub mod rows;
pub mod schema;
pub mod source;
pub mod validation;

pub use error::{Error, GenerationError, QueryError, Result};
pub use generation::{Credential, GenerationRequest, TextGenerator};
pub use graph::{GraphHit, GraphSummary, RelationGraph};
pub use ident::{is_reserved_word, needs_quoting, qualified_ident, quote_ident, split_qualified};
pub use proposal::{Complexity, InvolvedRelationship, ValidationProposal, ValidationType};
pub use redaction::{RedactedConnection, redact_connection_string};
pub use rows::{ResultRow, ScalarValue, column_names};
pub use schema::{
    ColumnInfo, DeclaredRelation, DetectionMethod, ImplicitRelation, QualityBreakdown,
    RankedRelation, RelationKind, SchemaModel, TableInfo, TableKind, ValidationOpportunity,
};
pub use source::RowSource;
pub use validation::validate_schema_model;

/// Current contract version for serialized `SchemaModel` artifacts.
pub const MODEL_VERSION: &str = "0.1";
