use std::time::Duration;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crosscheck_core::ResultRow;
use crosscheck_translate::TranslatedValidation;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOptions {
    /// Statements running at the same time.
    pub max_concurrency: usize,
    pub statement_timeout: Duration,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 5,
            statement_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeStatus {
    Pass,
    IssuesFound,
    Critical,
    Error,
    NoData,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Pass => "pass",
            OutcomeStatus::IssuesFound => "issues-found",
            OutcomeStatus::Critical => "critical",
            OutcomeStatus::Error => "error",
            OutcomeStatus::NoData => "no-data",
        }
    }
}

/// What a statement's rows say about data quality.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationOutcome {
    pub status: OutcomeStatus,
    pub issue_count: u64,
    pub total_records: Option<u64>,
    /// `(total - issues) / total * 100`, when a total is known.
    pub quality_percentage: Option<f64>,
    pub rows: Vec<ResultRow>,
}

impl ValidationOutcome {
    pub fn error() -> Self {
        Self {
            status: OutcomeStatus::Error,
            issue_count: 0,
            total_records: None,
            quality_percentage: None,
            rows: Vec::new(),
        }
    }
}

/// One execution attempt of a translated validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutedValidation {
    pub translated: TranslatedValidation,
    pub execution_status: ExecutionStatus,
    pub duration_ms: u64,
    pub row_count: usize,
    pub outcome: ValidationOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub executed_at: DateTime<Utc>,
}

impl ExecutedValidation {
    pub fn proposal_id(&self) -> &str {
        &self.translated.proposal.id
    }

    pub fn is_success(&self) -> bool {
        self.execution_status == ExecutionStatus::Success
    }
}

/// Everything the engine did with one batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionBatch {
    /// One entry per gate-passed statement that was started.
    pub executed: Vec<ExecutedValidation>,
    /// Statements the gate rejected, and placeholders; never sent.
    pub skipped: Vec<TranslatedValidation>,
    /// Gate-passed statements left untouched after cancellation.
    pub not_executed: Vec<TranslatedValidation>,
    pub cancelled: bool,
    pub duration_ms: u64,
}
