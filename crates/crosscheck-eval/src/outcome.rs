//! Classifies result rows into a validation outcome.

use crosscheck_core::ResultRow;

use crate::model::{OutcomeStatus, ValidationOutcome};

/// Quality below this percentage is critical.
pub const CRITICAL_QUALITY: f64 = 50.0;

pub const TOTAL_ALIASES: &[&str] = &[
    "total_records",
    "total",
    "total_count",
    "total_rows",
    "record_count",
    "row_count",
    "checked_records",
];

pub const VALID_ALIASES: &[&str] = &[
    "valid_records",
    "valid",
    "valid_count",
    "passed_records",
    "matched_records",
];

pub const INVALID_ALIASES: &[&str] = &[
    "invalid_records",
    "invalid",
    "invalid_count",
    "orphaned_records",
    "orphan_count",
    "orphans",
    "duplicate_records",
    "duplicates",
    "inconsistent_records",
    "violations",
    "violation_count",
    "issue_count",
    "issues",
    "failed_records",
];

/// Best-effort outcome from a statement's rows.
///
/// Counts are summed across rows for the first alias of each family that
/// appears. A result with no invalid count and no valid+total pair has no
/// countable shape and is `no-data`.
pub fn classify_rows(rows: Vec<ResultRow>) -> ValidationOutcome {
    let total = sum_first_alias(&rows, TOTAL_ALIASES);
    let valid = sum_first_alias(&rows, VALID_ALIASES);
    let invalid = sum_first_alias(&rows, INVALID_ALIASES);

    let (issues, total) = match (invalid, valid, total) {
        (Some(invalid), valid, total) => (invalid, total.or(valid.map(|v| v + invalid))),
        (None, Some(valid), Some(total)) => (total.saturating_sub(valid), Some(total)),
        _ => {
            return ValidationOutcome {
                status: OutcomeStatus::NoData,
                issue_count: 0,
                total_records: total,
                quality_percentage: None,
                rows,
            };
        }
    };

    let quality = total.map(|total| quality_percentage(total, issues));
    let status = if issues == 0 {
        OutcomeStatus::Pass
    } else if quality.is_some_and(|quality| quality < CRITICAL_QUALITY) {
        OutcomeStatus::Critical
    } else {
        OutcomeStatus::IssuesFound
    };

    ValidationOutcome {
        status,
        issue_count: issues,
        total_records: total,
        quality_percentage: quality,
        rows,
    }
}

fn quality_percentage(total: u64, issues: u64) -> f64 {
    if total == 0 {
        return if issues == 0 { 100.0 } else { 0.0 };
    }
    let clean = total.saturating_sub(issues) as f64;
    ((clean / total as f64) * 1000.0).round() / 10.0
}

fn sum_first_alias(rows: &[ResultRow], aliases: &[&str]) -> Option<u64> {
    let alias = aliases
        .iter()
        .find(|alias| rows.iter().any(|row| row.get(alias).is_some_and(|v| v.as_f64().is_some())))?;
    let sum = rows
        .iter()
        .filter_map(|row| row.get(alias).and_then(|value| value.as_f64()))
        .map(|value| value.max(0.0).round() as u64)
        .sum();
    Some(sum)
}
