//! Context collection: related-table walk, bounded row sampling and the
//! complexity measure that sizes the generation request.

pub mod collector;
pub mod complexity;
pub mod context;
pub mod error;
pub mod options;
pub mod sampling;

pub use collector::{ContextCollector, resolve_focus};
pub use complexity::{complexity_score, relation_diversity};
pub use context::{AnalysisContext, RelatedTable, SampleStrategy, TableSample};
pub use error::ContextError;
pub use options::CollectorOptions;
pub use sampling::{SamplePlan, plan_sample};
