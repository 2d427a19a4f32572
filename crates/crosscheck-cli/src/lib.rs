//! End-to-end validation run: wires discovery, context collection,
//! proposals, translation, execution and the dashboard together.

pub mod config;
pub mod pipeline;

pub use config::{ConfigError, DEFAULT_CONFIG_FILE, PipelineConfig};
pub use pipeline::{
    PipelineDeps, PipelineError, PipelineOptions, PipelineReport, PipelineRequest, run_pipeline,
};
