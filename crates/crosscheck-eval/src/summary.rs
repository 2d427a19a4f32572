use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crosscheck_core::ValidationType;
use crosscheck_translate::{TranslatedValidation, TranslationMethod};

use crate::model::{ExecutedValidation, ExecutionBatch, OutcomeStatus};

/// Priority at or above which a validation with issues is high priority.
pub const HIGH_PRIORITY: u8 = 8;
/// Lower bound of the medium-priority band `[5, 8)`.
pub const MEDIUM_PRIORITY: u8 = 5;

/// Wall-clock milliseconds per pipeline stage.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageTimings {
    pub discovery_ms: u64,
    pub context_ms: u64,
    pub proposal_ms: u64,
    pub translation_ms: u64,
    pub execution_ms: u64,
    pub visualization_ms: u64,
    pub total_ms: u64,
}

/// Whether a validation's SQL was trusted and run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Disposition {
    Executed,
    RejectedForSafety,
    ManualReview,
    NotExecuted,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Executed => "executed",
            Disposition::RejectedForSafety => "rejected-for-safety",
            Disposition::ManualReview => "manual-review",
            Disposition::NotExecuted => "not-executed",
        }
    }
}

/// Per-validation line of the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationEntry {
    pub proposal_id: String,
    pub sequence: u32,
    pub description: String,
    pub validation_type: ValidationType,
    pub priority: u8,
    pub method: TranslationMethod,
    pub disposition: Disposition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OutcomeStatus>,
    pub issue_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_records: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
}

/// A validation that found problems.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssueItem {
    pub proposal_id: String,
    pub description: String,
    pub validation_type: ValidationType,
    pub priority: u8,
    pub status: OutcomeStatus,
    pub issue_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_percentage: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub focus_table: String,
    pub total_validations: usize,
    pub executed: usize,
    pub successful: usize,
    pub failed: usize,
    pub rejected_for_safety: usize,
    pub manual_review: usize,
    pub not_executed: usize,
    pub passed: usize,
    pub with_issues: usize,
    pub critical: usize,
    pub no_data: usize,
    pub total_issues: u64,
    /// Mean quality over successful executions that produced a quality.
    pub average_quality: Option<f64>,
    pub high_priority: Vec<IssueItem>,
    pub medium_priority: Vec<IssueItem>,
    pub recommendations: Vec<String>,
    pub insights: Vec<String>,
    pub timings: StageTimings,
    pub validations: Vec<ValidationEntry>,
    pub cancelled: bool,
    pub generated_at: DateTime<Utc>,
}

/// Aggregate one execution batch.
///
/// `include_sql` only controls whether statements are echoed in the
/// per-validation entries.
pub fn summarize(
    focus_table: &str,
    batch: &ExecutionBatch,
    insights: &[String],
    timings: StageTimings,
    include_sql: bool,
) -> ExecutionSummary {
    let executed = &batch.executed;
    let successful: Vec<&ExecutedValidation> = executed.iter().filter(|e| e.is_success()).collect();
    let count_status =
        |status: OutcomeStatus| executed.iter().filter(|e| e.outcome.status == status).count();

    let qualities: Vec<f64> = successful
        .iter()
        .filter_map(|e| e.outcome.quality_percentage)
        .collect();
    let average_quality = (!qualities.is_empty()).then(|| {
        let mean = qualities.iter().sum::<f64>() / qualities.len() as f64;
        (mean * 10.0).round() / 10.0
    });

    let (high_priority, medium_priority) = bucket_issues(executed);

    let mut validations: Vec<ValidationEntry> = Vec::new();
    validations.extend(executed.iter().map(|e| executed_entry(e, include_sql)));
    validations.extend(
        batch
            .skipped
            .iter()
            .map(|t| skipped_entry(t, unexecuted_disposition(t), include_sql)),
    );
    validations.extend(
        batch
            .not_executed
            .iter()
            .map(|t| skipped_entry(t, Disposition::NotExecuted, include_sql)),
    );
    validations.sort_by_key(|entry| entry.sequence);

    let disposition_count =
        |d: Disposition| validations.iter().filter(|entry| entry.disposition == d).count();
    let rejected_for_safety = disposition_count(Disposition::RejectedForSafety);
    let manual_review = disposition_count(Disposition::ManualReview);

    let mut summary = ExecutionSummary {
        focus_table: focus_table.to_string(),
        total_validations: validations.len(),
        executed: executed.len(),
        successful: successful.len(),
        failed: executed.len() - successful.len(),
        rejected_for_safety,
        manual_review,
        not_executed: batch.not_executed.len(),
        passed: count_status(OutcomeStatus::Pass),
        with_issues: count_status(OutcomeStatus::IssuesFound),
        critical: count_status(OutcomeStatus::Critical),
        no_data: count_status(OutcomeStatus::NoData),
        total_issues: successful.iter().map(|e| e.outcome.issue_count).sum(),
        average_quality,
        high_priority,
        medium_priority,
        recommendations: Vec::new(),
        insights: insights.to_vec(),
        timings,
        validations,
        cancelled: batch.cancelled,
        generated_at: Utc::now(),
    };
    summary.recommendations = recommendations(&summary);
    summary
}

fn unexecuted_disposition(translated: &TranslatedValidation) -> Disposition {
    if translated.safety.is_safe() {
        Disposition::ManualReview
    } else {
        Disposition::RejectedForSafety
    }
}

fn executed_entry(executed: &ExecutedValidation, include_sql: bool) -> ValidationEntry {
    let translated = &executed.translated;
    let disposition = if translated.requires_manual_review {
        Disposition::ManualReview
    } else {
        Disposition::Executed
    };
    let mut entry = skipped_entry(translated, disposition, include_sql);
    entry.status = Some(executed.outcome.status);
    entry.issue_count = executed.outcome.issue_count;
    entry.total_records = executed.outcome.total_records;
    entry.quality_percentage = executed.outcome.quality_percentage;
    entry.duration_ms = Some(executed.duration_ms);
    entry.error = executed.error.clone();
    entry
}

fn skipped_entry(
    translated: &TranslatedValidation,
    disposition: Disposition,
    include_sql: bool,
) -> ValidationEntry {
    let proposal = &translated.proposal;
    let note = match translated.safety.reason() {
        Some(reason) => Some(format!("rejected: {reason}")),
        None => translated.note.clone(),
    };
    ValidationEntry {
        proposal_id: proposal.id.clone(),
        sequence: proposal.sequence,
        description: proposal.description.clone(),
        validation_type: proposal.validation_type,
        priority: proposal.priority,
        method: translated.method,
        disposition,
        status: None,
        issue_count: 0,
        total_records: None,
        quality_percentage: None,
        duration_ms: None,
        error: None,
        note,
        sql: include_sql.then(|| translated.sql.clone()),
    }
}

fn issue_item(executed: &ExecutedValidation) -> IssueItem {
    let proposal = &executed.translated.proposal;
    IssueItem {
        proposal_id: proposal.id.clone(),
        description: proposal.description.clone(),
        validation_type: proposal.validation_type,
        priority: proposal.priority,
        status: executed.outcome.status,
        issue_count: executed.outcome.issue_count,
        quality_percentage: executed.outcome.quality_percentage,
    }
}

/// High: critical, or priority >= 8 with issues. Medium: issues-found with
/// priority in `[5, 8)`.
fn bucket_issues(executed: &[ExecutedValidation]) -> (Vec<IssueItem>, Vec<IssueItem>) {
    let mut high = Vec::new();
    let mut medium = Vec::new();
    for item in executed.iter().filter(|e| e.is_success()) {
        let outcome = &item.outcome;
        let priority = item.translated.proposal.priority;
        if outcome.status == OutcomeStatus::Critical
            || (priority >= HIGH_PRIORITY && outcome.issue_count > 0)
        {
            high.push(issue_item(item));
        } else if outcome.status == OutcomeStatus::IssuesFound
            && (MEDIUM_PRIORITY..HIGH_PRIORITY).contains(&priority)
        {
            medium.push(issue_item(item));
        }
    }
    let order = |a: &IssueItem, b: &IssueItem| {
        b.priority
            .cmp(&a.priority)
            .then(b.issue_count.cmp(&a.issue_count))
            .then(a.proposal_id.cmp(&b.proposal_id))
    };
    high.sort_by(order);
    medium.sort_by(order);
    (high, medium)
}

fn recommendations(summary: &ExecutionSummary) -> Vec<String> {
    let mut lines = Vec::new();

    if !summary.high_priority.is_empty() {
        let names: Vec<&str> = summary
            .high_priority
            .iter()
            .take(3)
            .map(|item| item.description.as_str())
            .collect();
        lines.push(format!(
            "Address {} high-priority issue(s) first: {}.",
            summary.high_priority.len(),
            names.join("; ")
        ));
    }

    let mut by_type: BTreeMap<ValidationType, usize> = BTreeMap::new();
    for item in summary.high_priority.iter().chain(&summary.medium_priority) {
        *by_type.entry(item.validation_type).or_default() += 1;
    }
    for (validation_type, count) in by_type {
        let advice = match validation_type {
            ValidationType::ReferentialIntegrity => {
                "review orphaned rows and consider declaring the missing foreign keys"
            }
            ValidationType::TemporalConsistency => {
                "check the code paths that write these dates for ordering bugs"
            }
            ValidationType::StatusConsistency => {
                "review status transitions so child rows follow their parent's lifecycle"
            }
            ValidationType::Uniqueness => "deduplicate the rows and add a unique constraint",
            ValidationType::Format => "add format checks at the point of entry",
            ValidationType::Anomaly => "inspect the outliers before trusting aggregates",
            ValidationType::BusinessRule => "confirm the rule with the data owners",
        };
        lines.push(format!(
            "{} problems in {count} check(s): {advice}.",
            type_label(validation_type)
        ));
    }

    if summary.failed > 0 {
        lines.push(format!(
            "{} validation(s) failed to execute; review their SQL and database permissions.",
            summary.failed
        ));
    }
    if summary.rejected_for_safety > 0 {
        lines.push(format!(
            "{} statement(s) were rejected by the safety gate; write these checks by hand.",
            summary.rejected_for_safety
        ));
    }
    if summary.manual_review > 0 {
        lines.push(format!(
            "{} validation(s) rely on generic fallback queries and need manual review.",
            summary.manual_review
        ));
    }
    if summary.cancelled {
        lines.push("The run was cancelled; results are partial.".to_string());
    }
    if lines.is_empty() && summary.executed > 0 {
        lines.push("No data-quality issues detected; re-run periodically to catch drift.".to_string());
    }
    lines
}

pub fn type_label(validation_type: ValidationType) -> &'static str {
    match validation_type {
        ValidationType::ReferentialIntegrity => "Referential integrity",
        ValidationType::TemporalConsistency => "Temporal consistency",
        ValidationType::StatusConsistency => "Status consistency",
        ValidationType::Uniqueness => "Uniqueness",
        ValidationType::Format => "Format",
        ValidationType::Anomaly => "Anomaly",
        ValidationType::BusinessRule => "Business rule",
    }
}
