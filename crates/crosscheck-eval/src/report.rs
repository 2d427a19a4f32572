use crate::summary::{ExecutionSummary, IssueItem, type_label};

/// Render a markdown report from an execution summary.
pub fn render_report(summary: &ExecutionSummary) -> String {
    let mut lines = Vec::new();

    lines.push(format!("# Data Quality Report: {}", summary.focus_table));
    lines.push(String::new());
    lines.push("## Run summary".to_string());
    lines.push(format!("- generated_at: {}", summary.generated_at.to_rfc3339()));
    lines.push(format!("- validations: {}", summary.total_validations));
    lines.push(format!(
        "- executed: {} ({} successful, {} failed)",
        summary.executed, summary.successful, summary.failed
    ));
    lines.push(format!("- rejected_for_safety: {}", summary.rejected_for_safety));
    lines.push(format!("- manual_review: {}", summary.manual_review));
    if summary.not_executed > 0 {
        lines.push(format!("- not_executed: {}", summary.not_executed));
    }
    lines.push(format!("- total_issues: {}", summary.total_issues));
    lines.push(format!(
        "- average_quality: {}",
        summary
            .average_quality
            .map(|quality| format!("{quality:.1}%"))
            .unwrap_or_else(|| "-".to_string())
    ));
    if summary.cancelled {
        lines.push("- cancelled: true (partial results)".to_string());
    }
    lines.push(String::new());

    lines.push("## Validations".to_string());
    lines.push("| # | type | priority | disposition | status | issues | quality |".to_string());
    lines.push("| --- | --- | --- | --- | --- | --- | --- |".to_string());
    for entry in &summary.validations {
        lines.push(format!(
            "| {} | {} | {} | {} | {} | {} | {} |",
            entry.sequence,
            entry.validation_type.as_str(),
            entry.priority,
            entry.disposition.as_str(),
            entry.status.map(|status| status.as_str()).unwrap_or("-"),
            entry.issue_count,
            entry
                .quality_percentage
                .map(|quality| format!("{quality:.1}%"))
                .unwrap_or_else(|| "-".to_string()),
        ));
    }
    lines.push(String::new());

    push_issue_section(&mut lines, "High-priority issues", &summary.high_priority);
    push_issue_section(&mut lines, "Medium-priority issues", &summary.medium_priority);

    let notes: Vec<_> = summary
        .validations
        .iter()
        .filter_map(|entry| {
            let detail = entry.error.as_deref().or(entry.note.as_deref())?;
            Some(format!("- #{} {}: {}", entry.sequence, entry.description, detail))
        })
        .collect();
    if !notes.is_empty() {
        lines.push("## Notes".to_string());
        lines.extend(notes);
        lines.push(String::new());
    }

    if summary.validations.iter().any(|entry| entry.sql.is_some()) {
        lines.push("## SQL".to_string());
        for entry in &summary.validations {
            if let Some(sql) = &entry.sql {
                lines.push(format!("### #{} {}", entry.sequence, entry.description));
                lines.push("```sql".to_string());
                lines.push(sql.clone());
                lines.push("```".to_string());
            }
        }
        lines.push(String::new());
    }

    if !summary.insights.is_empty() {
        lines.push("## Insights".to_string());
        for insight in &summary.insights {
            lines.push(format!("- {insight}"));
        }
        lines.push(String::new());
    }

    lines.push("## Recommendations".to_string());
    for recommendation in &summary.recommendations {
        lines.push(format!("- {recommendation}"));
    }
    lines.join("\n")
}

fn push_issue_section(lines: &mut Vec<String>, title: &str, items: &[IssueItem]) {
    if items.is_empty() {
        return;
    }
    lines.push(format!("## {title}"));
    for item in items {
        let quality = item
            .quality_percentage
            .map(|quality| format!(", quality {quality:.1}%"))
            .unwrap_or_default();
        lines.push(format!(
            "- [{}] {} (priority {}): {} issue(s){}",
            type_label(item.validation_type),
            item.description,
            item.priority,
            item.issue_count,
            quality
        ));
    }
    lines.push(String::new());
}
