use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crosscheck_context::{CollectorOptions, ContextCollector, ContextError};
use crosscheck_core::{Credential, GenerationError, RowSource, SchemaModel, TextGenerator};
use crosscheck_eval::{
    DashboardSpec, ExecutionEngine, ExecutionOptions, ExecutionSummary, StageTimings,
    build_dashboard, summarize,
};
use crosscheck_introspect::{Adapter, DiscoveryError, DiscoveryOptions};
use crosscheck_propose::{ProposerOptions, ValidationProposer};
use crosscheck_translate::{TranslationService, TranslatorOptions};

/// Failures that stop a run before anything was executed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("schema discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),
    #[error("context collection failed: {0}")]
    Context(#[from] ContextError),
    #[error("validation proposal failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("run cancelled during {stage}")]
    Cancelled { stage: &'static str },
}

/// Collaborators for one run. The row source is shared by context sampling
/// and execution; the generator by the proposer and the SQL fallback.
#[derive(Clone)]
pub struct PipelineDeps {
    pub adapter: Arc<dyn Adapter>,
    pub rows: Arc<dyn RowSource>,
    pub generator: Arc<dyn TextGenerator>,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub discovery: DiscoveryOptions,
    pub context: CollectorOptions,
    pub proposer: ProposerOptions,
    pub translation: TranslatorOptions,
    pub execution: ExecutionOptions,
}

#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub focus_table: String,
    pub business_context: Option<String>,
    pub credential: Option<Credential>,
    /// Echo translated SQL in the summary. Statements run either way.
    pub include_sql: bool,
    pub options: PipelineOptions,
}

impl PipelineRequest {
    pub fn new(focus_table: impl Into<String>) -> Self {
        Self {
            focus_table: focus_table.into(),
            business_context: None,
            credential: None,
            include_sql: false,
            options: PipelineOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub schema: SchemaModel,
    pub summary: ExecutionSummary,
    pub dashboard: DashboardSpec,
}

/// Discovery, context, proposals, translation, execution, visualization.
///
/// Cancellation before execution returns `PipelineError::Cancelled`; during
/// execution the report is returned with `summary.cancelled` set and only
/// the completed validations in it.
pub async fn run_pipeline(
    deps: &PipelineDeps,
    request: PipelineRequest,
    cancel: &CancellationToken,
) -> Result<PipelineReport, PipelineError> {
    let PipelineRequest {
        focus_table,
        business_context,
        credential,
        include_sql,
        options,
    } = request;
    let run_started = Instant::now();
    let mut timings = StageTimings::default();

    info!(
        event = "pipeline_started",
        engine = deps.adapter.engine(),
        focus = %focus_table,
        has_credential = credential.as_ref().is_some_and(|c| !c.is_blank()),
        include_sql
    );

    let started = Instant::now();
    let model = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(PipelineError::Cancelled { stage: "discovery" }),
        result = deps.adapter.discover(&options.discovery) => result?,
    };
    timings.discovery_ms = stage_finished("discovery", started);

    let started = Instant::now();
    let collector = ContextCollector::new(Arc::clone(&deps.rows), options.context);
    let context = collector
        .collect(&model, &focus_table, business_context.as_deref(), cancel)
        .await
        .map_err(|err| match err {
            ContextError::Cancelled => PipelineError::Cancelled { stage: "context" },
            other => PipelineError::Context(other),
        })?;
    timings.context_ms = stage_finished("context", started);

    let started = Instant::now();
    let proposer = ValidationProposer::new(Arc::clone(&deps.generator), options.proposer);
    let proposed = proposer
        .propose(&context, credential.as_ref(), cancel)
        .await
        .map_err(|err| match err {
            GenerationError::Cancelled => PipelineError::Cancelled { stage: "proposal" },
            other => PipelineError::Generation(other),
        })?;
    timings.proposal_ms = stage_finished("proposal", started);

    let started = Instant::now();
    let translator = TranslationService::new(Some(Arc::clone(&deps.generator)), options.translation);
    let translated = translator
        .translate_all(&proposed.proposals, &model, credential.as_ref(), cancel)
        .await;
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled {
            stage: "translation",
        });
    }
    timings.translation_ms = stage_finished("translation", started);

    let started = Instant::now();
    let engine = ExecutionEngine::new(options.execution);
    let batch = engine.execute(Arc::clone(&deps.rows), translated, cancel).await;
    timings.execution_ms = stage_finished("execution", started);

    let started = Instant::now();
    let mut summary = summarize(
        &context.focus_table,
        &batch,
        &proposed.insights,
        timings,
        include_sql,
    );
    let dashboard = build_dashboard(&summary, &batch.executed, &proposed.insights);
    summary.timings.visualization_ms = stage_finished("visualization", started);
    summary.timings.total_ms = run_started.elapsed().as_millis() as u64;

    info!(
        event = "pipeline_finished",
        focus = %summary.focus_table,
        status = if summary.cancelled { "partial" } else { "success" },
        validations = summary.total_validations,
        executed = summary.executed,
        rejected = summary.rejected_for_safety,
        total_issues = summary.total_issues,
        duration_ms = summary.timings.total_ms
    );

    Ok(PipelineReport {
        schema: model,
        summary,
        dashboard,
    })
}

fn stage_finished(stage: &'static str, started: Instant) -> u64 {
    let duration_ms = started.elapsed().as_millis() as u64;
    info!(event = "stage_finished", stage, duration_ms);
    duration_ms
}
