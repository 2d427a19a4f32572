//! Execution engine, summary aggregation, markdown report and visualization
//! mapping for translated validations.

pub mod engine;
pub mod errors;
pub mod model;
pub mod outcome;
pub mod report;
pub mod summary;
pub mod visualize;

pub use engine::ExecutionEngine;
pub use errors::ExecutionError;
pub use model::{
    ExecutedValidation, ExecutionBatch, ExecutionOptions, ExecutionStatus, OutcomeStatus,
    ValidationOutcome,
};
pub use outcome::{CRITICAL_QUALITY, classify_rows};
pub use report::render_report;
pub use summary::{
    Disposition, ExecutionSummary, IssueItem, StageTimings, ValidationEntry, summarize,
};
pub use visualize::{
    ChartConfig, ChartType, DashboardLayout, DashboardSpec, LayoutRow, OVERVIEW_ID,
    VisualizationSpec, build_dashboard, dashboard_json_schema, decide_chart, layout,
    map_validation,
};
