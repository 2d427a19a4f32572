//! Maps executed validations to chart specs and lays out the dashboard.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use schemars::schema::RootSchema;
use schemars::schema_for;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crosscheck_core::{ResultRow, ValidationType, column_names};

use crate::model::{ExecutedValidation, OutcomeStatus};
use crate::summary::{ExecutionSummary, type_label};

/// Display priority of the overview, above any proposal priority.
pub const OVERVIEW_PRIORITY: u8 = 10;
pub const OVERVIEW_ID: &str = "overview";
/// Result sets with more rows than this become histograms.
pub const HISTOGRAM_MIN_ROWS: usize = 5;

const PERCENT_TOKENS: &[&str] = &["pct", "percent", "percentage", "ratio", "rate", "share"];
const TEMPORAL_TOKENS: &[&str] = &[
    "date", "time", "timestamp", "at", "day", "week", "month", "year", "period", "hour",
];
const CATEGORY_TOKENS: &[&str] = &["status", "state", "category", "type", "kind"];
const RELATION_CUES: &[&str] = &[
    "relationship", "relation", "foreign key", "reference", "orphan", "join", "linked",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ChartType {
    InfoCard,
    QualityGauge,
    Timeline,
    PieChart,
    Histogram,
    NetworkGraph,
    BarChart,
}

/// Rendering hints; fields a chart type does not use stay empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ChartConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub color_scheme: String,
    pub show_legend: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct VisualizationSpec {
    pub id: String,
    pub title: String,
    pub chart_type: ChartType,
    pub priority: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_type: Option<ValidationType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OutcomeStatus>,
    pub data: Value,
    pub config: ChartConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct LayoutRow {
    /// Grid columns in this row (1, 2 or 3).
    pub columns: u8,
    pub visualization_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct DashboardLayout {
    pub rows: Vec<LayoutRow>,
}

/// Data and layout for the presentation layer; no rendering logic.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct DashboardSpec {
    pub title: String,
    pub focus_table: String,
    /// RFC 3339 timestamp of the underlying summary.
    pub generated_at: String,
    pub visualizations: Vec<VisualizationSpec>,
    pub layout: DashboardLayout,
    pub insights: Vec<String>,
}

/// Exactly one spec per executed validation, decided only from its result
/// shape, type and description.
pub fn map_validation(executed: &ExecutedValidation) -> VisualizationSpec {
    let proposal = &executed.translated.proposal;
    let rows = &executed.outcome.rows;
    let columns = column_names(rows);
    let chart_type = decide_chart(
        rows,
        &columns,
        proposal.validation_type,
        &proposal.description,
    );

    VisualizationSpec {
        id: format!("viz_{}", proposal.id),
        title: proposal.description.clone(),
        chart_type,
        priority: proposal.priority,
        validation_id: Some(proposal.id.clone()),
        validation_type: Some(proposal.validation_type),
        status: Some(executed.outcome.status),
        data: json!({
            "rows": rows,
            "status": executed.outcome.status,
            "issue_count": executed.outcome.issue_count,
            "total_records": executed.outcome.total_records,
            "quality_percentage": executed.outcome.quality_percentage,
            "error": executed.error,
        }),
        config: chart_config(chart_type, rows, &columns, executed.outcome.status),
    }
}

/// First match wins.
pub fn decide_chart(
    rows: &[ResultRow],
    columns: &[String],
    validation_type: ValidationType,
    description: &str,
) -> ChartType {
    if rows.is_empty() {
        return ChartType::InfoCard;
    }
    if columns.iter().any(|c| has_token(c, PERCENT_TOKENS)) {
        return ChartType::QualityGauge;
    }
    if columns.iter().any(|c| has_token(c, TEMPORAL_TOKENS))
        || validation_type == ValidationType::TemporalConsistency
    {
        return ChartType::Timeline;
    }
    if columns.iter().any(|c| has_token(c, CATEGORY_TOKENS))
        || validation_type == ValidationType::StatusConsistency
    {
        return ChartType::PieChart;
    }
    if rows.len() > HISTOGRAM_MIN_ROWS {
        return ChartType::Histogram;
    }
    let description = description.to_lowercase();
    if validation_type == ValidationType::ReferentialIntegrity
        || RELATION_CUES.iter().any(|cue| description.contains(cue))
    {
        return ChartType::NetworkGraph;
    }
    if columns.len() > 2 {
        return ChartType::BarChart;
    }
    ChartType::InfoCard
}

fn has_token(column: &str, tokens: &[&str]) -> bool {
    column
        .to_ascii_lowercase()
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .any(|part| tokens.contains(&part))
}

fn chart_config(
    chart_type: ChartType,
    rows: &[ResultRow],
    columns: &[String],
    status: OutcomeStatus,
) -> ChartConfig {
    let find = |tokens: &[&str]| columns.iter().find(|c| has_token(c, tokens)).cloned();
    let numeric = columns
        .iter()
        .find(|c| rows.iter().any(|row| row.get(c).is_some_and(|v| v.as_f64().is_some())))
        .cloned();
    let text = columns
        .iter()
        .find(|c| rows.iter().any(|row| row.get(c).and_then(|v| v.as_text()).is_some()))
        .cloned();

    let mut config = ChartConfig {
        color_scheme: color_scheme(status).to_string(),
        ..ChartConfig::default()
    };
    match chart_type {
        ChartType::QualityGauge => {
            config.value_field = find(PERCENT_TOKENS);
            config.unit = Some("%".to_string());
        }
        ChartType::Timeline => {
            config.x_field = find(TEMPORAL_TOKENS);
            config.y_field = numeric;
        }
        ChartType::PieChart => {
            config.category_field = find(CATEGORY_TOKENS).or(text);
            config.value_field = numeric;
            config.show_legend = true;
        }
        ChartType::Histogram | ChartType::BarChart => {
            config.x_field = text.or_else(|| columns.first().cloned());
            config.y_field = numeric;
        }
        ChartType::NetworkGraph => {
            config.show_legend = true;
        }
        ChartType::InfoCard => {}
    }
    config
}

fn color_scheme(status: OutcomeStatus) -> &'static str {
    match status {
        OutcomeStatus::Pass => "green",
        OutcomeStatus::IssuesFound => "amber",
        OutcomeStatus::Critical | OutcomeStatus::Error => "red",
        OutcomeStatus::NoData => "grey",
    }
}

/// Always built from the summary, never from a single validation.
pub fn overview(summary: &ExecutionSummary) -> VisualizationSpec {
    let status = match summary.average_quality {
        None => OutcomeStatus::NoData,
        Some(_) if summary.critical > 0 => OutcomeStatus::Critical,
        Some(_) if summary.total_issues > 0 => OutcomeStatus::IssuesFound,
        Some(_) => OutcomeStatus::Pass,
    };
    VisualizationSpec {
        id: OVERVIEW_ID.to_string(),
        title: format!("Data quality overview: {}", summary.focus_table),
        chart_type: ChartType::QualityGauge,
        priority: OVERVIEW_PRIORITY,
        validation_id: None,
        validation_type: None,
        status: Some(status),
        data: json!({
            "average_quality": summary.average_quality,
            "total_validations": summary.total_validations,
            "executed": summary.executed,
            "passed": summary.passed,
            "with_issues": summary.with_issues,
            "critical": summary.critical,
            "errors": summary.failed,
            "total_issues": summary.total_issues,
            "rejected_for_safety": summary.rejected_for_safety,
            "manual_review": summary.manual_review,
        }),
        config: ChartConfig {
            value_field: Some("average_quality".to_string()),
            unit: Some("%".to_string()),
            color_scheme: color_scheme(status).to_string(),
            show_legend: false,
            ..ChartConfig::default()
        },
    }
}

/// One bar chart per validation type shared by more than one validation.
pub fn type_aggregates(executed: &[ExecutedValidation]) -> Vec<VisualizationSpec> {
    let mut groups: BTreeMap<ValidationType, Vec<&ExecutedValidation>> = BTreeMap::new();
    for item in executed {
        groups
            .entry(item.translated.proposal.validation_type)
            .or_default()
            .push(item);
    }

    groups
        .into_iter()
        .filter(|(_, items)| items.len() > 1)
        .map(|(validation_type, items)| {
            let bars: Vec<Value> = items
                .iter()
                .map(|item| {
                    json!({
                        "validation": item.translated.proposal.description,
                        "sequence": item.translated.proposal.sequence,
                        "issue_count": item.outcome.issue_count,
                        "quality_percentage": item.outcome.quality_percentage,
                        "status": item.outcome.status,
                    })
                })
                .collect();
            let worst = items
                .iter()
                .map(|item| item.outcome.status)
                .max_by_key(|status| severity(*status))
                .unwrap_or(OutcomeStatus::NoData);
            VisualizationSpec {
                id: format!("aggregate_{}", validation_type.as_str()),
                title: format!("{} checks", type_label(validation_type)),
                chart_type: ChartType::BarChart,
                priority: items
                    .iter()
                    .map(|item| item.translated.proposal.priority)
                    .max()
                    .unwrap_or(1),
                validation_id: None,
                validation_type: Some(validation_type),
                status: Some(worst),
                data: json!({ "bars": bars }),
                config: ChartConfig {
                    x_field: Some("validation".to_string()),
                    y_field: Some("issue_count".to_string()),
                    color_scheme: color_scheme(worst).to_string(),
                    ..ChartConfig::default()
                },
            }
        })
        .collect()
}

fn severity(status: OutcomeStatus) -> u8 {
    match status {
        OutcomeStatus::NoData => 0,
        OutcomeStatus::Pass => 1,
        OutcomeStatus::IssuesFound => 2,
        OutcomeStatus::Critical => 3,
        OutcomeStatus::Error => 4,
    }
}

/// Overview full-width; up to two priority >= 8 specs in a two-column row;
/// the next up to three specs in a three-column row; the rest stay out of
/// the layout.
pub fn layout(visualizations: &[VisualizationSpec]) -> DashboardLayout {
    let mut rows = Vec::new();
    let mut rest: Vec<&VisualizationSpec> = Vec::new();
    for spec in visualizations {
        if spec.id == OVERVIEW_ID {
            rows.push(LayoutRow {
                columns: 1,
                visualization_ids: vec![spec.id.clone()],
            });
        } else {
            rest.push(spec);
        }
    }
    rest.sort_by(|a, b| b.priority.cmp(&a.priority));

    let featured: Vec<String> = rest
        .iter()
        .filter(|spec| spec.priority >= 8)
        .take(2)
        .map(|spec| spec.id.clone())
        .collect();
    let following: Vec<String> = rest
        .iter()
        .filter(|spec| !featured.contains(&spec.id))
        .take(3)
        .map(|spec| spec.id.clone())
        .collect();

    if !featured.is_empty() {
        rows.push(LayoutRow {
            columns: 2,
            visualization_ids: featured,
        });
    }
    if !following.is_empty() {
        rows.push(LayoutRow {
            columns: 3,
            visualization_ids: following,
        });
    }
    DashboardLayout { rows }
}

/// Overview first, then one spec per executed validation, then per-type
/// aggregates.
pub fn build_dashboard(
    summary: &ExecutionSummary,
    executed: &[ExecutedValidation],
    insights: &[String],
) -> DashboardSpec {
    let mut visualizations = vec![overview(summary)];
    visualizations.extend(executed.iter().map(map_validation));
    visualizations.extend(type_aggregates(executed));

    let layout = layout(&visualizations);
    DashboardSpec {
        title: format!("Cross-table validation: {}", summary.focus_table),
        focus_table: summary.focus_table.clone(),
        generated_at: summary.generated_at.to_rfc3339(),
        visualizations,
        layout,
        insights: dashboard_insights(summary, insights),
    }
}

fn dashboard_insights(summary: &ExecutionSummary, insights: &[String]) -> Vec<String> {
    let mut lines = Vec::new();
    if summary.executed > 0 {
        lines.push(format!(
            "{} of {} executed validation(s) passed.",
            summary.passed, summary.executed
        ));
    }
    if let Some(quality) = summary.average_quality {
        lines.push(format!("Average data quality is {quality:.1}%."));
    }
    if summary.critical > 0 {
        lines.push(format!(
            "{} critical issue(s) need immediate attention.",
            summary.critical
        ));
    }
    if summary.cancelled {
        lines.push("Run cancelled; the dashboard shows partial results.".to_string());
    }
    lines.extend(insights.iter().cloned());
    lines
}

/// JSON Schema for `dashboard.json`.
pub fn dashboard_json_schema() -> RootSchema {
    schema_for!(DashboardSpec)
}
