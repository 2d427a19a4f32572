//! Schema discovery: enumerate tables and declared foreign keys, infer
//! undeclared relations, score table quality and rank relations.

pub mod adapter;
pub mod assemble;
pub mod errors;
pub mod inference;
pub mod options;
pub mod postgres;
pub mod quality;
pub mod ranking;
pub mod types;

#[cfg(test)]
mod testing;

pub use adapter::Adapter;
pub use assemble::{assemble_model, build_model};
pub use errors::{DiscoveryError, classify_sqlx_error};
pub use inference::{
    NamingDetector, RelationDetector, infer_implicit_relations, infer_with_detectors,
    infer_with_timeout,
};
pub use options::{DiscoveryOptions, InferenceOptions, MAX_CANDIDATES};
pub use postgres::{PgRowSource, PostgresAdapter, decode_row, discover, discover_postgres};
pub use quality::score_table;
pub use ranking::{implicit_importance, rank_relations};
