mod support;

use chrono::Utc;
use crosscheck_core::{ResultRow, ScalarValue, ValidationType};
use crosscheck_eval::{
    ChartType, ExecutedValidation, ExecutionBatch, ExecutionStatus, OVERVIEW_ID, StageTimings,
    build_dashboard, classify_rows, dashboard_json_schema, decide_chart, map_validation, summarize,
};
use jsonschema::JSONSchema;

use support::{proposal, translated};

fn counts(total: i64, invalid: i64) -> Vec<ResultRow> {
    vec![
        ResultRow::new()
            .with("total_records", ScalarValue::Int(total))
            .with("invalid_records", ScalarValue::Int(invalid)),
    ]
}

fn executed(sequence: u32, validation_type: ValidationType, priority: u8, rows: Vec<ResultRow>) -> ExecutedValidation {
    let translated = translated(proposal(sequence, validation_type, priority), "select 1");
    ExecutedValidation {
        translated,
        execution_status: ExecutionStatus::Success,
        duration_ms: 3,
        row_count: rows.len(),
        outcome: classify_rows(rows),
        error: None,
        executed_at: Utc::now(),
    }
}

#[test]
fn same_shape_and_type_map_to_same_chart() {
    let first = executed(1, ValidationType::Uniqueness, 5, counts(10, 1));
    let second = executed(2, ValidationType::Uniqueness, 7, counts(500, 0));
    assert_eq!(map_validation(&first).chart_type, map_validation(&second).chart_type);
    assert_eq!(map_validation(&first), map_validation(&first));
}

#[test]
fn chart_decision_follows_order() {
    let columns = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();
    let one_row = counts(1, 0);
    let many_rows: Vec<ResultRow> = (0..6).flat_map(|_| counts(1, 0)).collect();

    assert_eq!(
        decide_chart(&[], &columns(&["pass_rate"]), ValidationType::Anomaly, ""),
        ChartType::InfoCard
    );
    assert_eq!(
        decide_chart(&one_row, &columns(&["pass_rate", "created_at"]), ValidationType::Anomaly, ""),
        ChartType::QualityGauge
    );
    assert_eq!(
        decide_chart(&one_row, &columns(&["created_at", "status"]), ValidationType::Anomaly, ""),
        ChartType::Timeline
    );
    assert_eq!(
        decide_chart(&one_row, &columns(&["total"]), ValidationType::TemporalConsistency, ""),
        ChartType::Timeline
    );
    assert_eq!(
        decide_chart(&one_row, &columns(&["order_status", "n"]), ValidationType::Anomaly, ""),
        ChartType::PieChart
    );
    assert_eq!(
        decide_chart(&many_rows, &columns(&["total_records"]), ValidationType::ReferentialIntegrity, ""),
        ChartType::Histogram
    );
    assert_eq!(
        decide_chart(&one_row, &columns(&["total_records"]), ValidationType::ReferentialIntegrity, ""),
        ChartType::NetworkGraph
    );
    assert_eq!(
        decide_chart(&one_row, &columns(&["a", "b"]), ValidationType::Format, "orders reference customers"),
        ChartType::NetworkGraph
    );
    assert_eq!(
        decide_chart(&one_row, &columns(&["a", "b", "c"]), ValidationType::Format, ""),
        ChartType::BarChart
    );
    assert_eq!(
        decide_chart(&one_row, &columns(&["a", "b"]), ValidationType::Format, ""),
        ChartType::InfoCard
    );
}

fn dashboard_inputs() -> (ExecutionBatch, Vec<ExecutedValidation>) {
    let executed = vec![
        executed(1, ValidationType::ReferentialIntegrity, 9, counts(100, 4)),
        executed(2, ValidationType::ReferentialIntegrity, 8, counts(100, 0)),
        executed(3, ValidationType::TemporalConsistency, 9, counts(100, 70)),
        executed(4, ValidationType::Uniqueness, 6, counts(100, 0)),
        executed(5, ValidationType::Format, 4, Vec::new()),
        executed(6, ValidationType::Anomaly, 2, counts(100, 1)),
    ];
    let batch = ExecutionBatch {
        executed: executed.clone(),
        ..ExecutionBatch::default()
    };
    (batch, executed)
}

#[test]
fn dashboard_has_overview_aggregates_and_three_tier_layout() {
    let (batch, executed) = dashboard_inputs();
    let summary = summarize("public.orders", &batch, &[], StageTimings::default(), false);
    let dashboard = build_dashboard(&summary, &executed, &["model insight".to_string()]);

    // overview + six validations + one referential-integrity aggregate
    assert_eq!(dashboard.visualizations.len(), 8);
    let overview = &dashboard.visualizations[0];
    assert_eq!(overview.id, OVERVIEW_ID);
    assert_eq!(overview.chart_type, ChartType::QualityGauge);
    assert_eq!(overview.priority, 10);
    assert!(
        dashboard
            .visualizations
            .iter()
            .any(|v| v.id == "aggregate_referential-integrity" && v.chart_type == ChartType::BarChart)
    );

    let rows = &dashboard.layout.rows;
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].columns, 1);
    assert_eq!(rows[0].visualization_ids, vec![OVERVIEW_ID.to_string()]);
    assert_eq!(rows[1].columns, 2);
    assert_eq!(rows[1].visualization_ids, vec!["viz_val_001", "viz_val_003"]);
    assert_eq!(rows[2].columns, 3);
    assert_eq!(
        rows[2].visualization_ids,
        vec!["aggregate_referential-integrity", "viz_val_002", "viz_val_004"]
    );

    assert!(dashboard.insights.iter().any(|line| line.starts_with("2 of 6 executed")));
    assert_eq!(dashboard.insights.last().map(String::as_str), Some("model insight"));
}

#[test]
fn dashboard_json_matches_its_schema() {
    let (batch, executed) = dashboard_inputs();
    let summary = summarize("public.orders", &batch, &[], StageTimings::default(), true);
    let dashboard = build_dashboard(&summary, &executed, &[]);

    let schema = serde_json::to_value(dashboard_json_schema()).expect("serialize schema");
    let compiled = JSONSchema::compile(&schema).expect("compile schema");
    let instance = serde_json::to_value(&dashboard).expect("serialize dashboard");
    assert!(compiled.is_valid(&instance));
    assert_eq!(instance["visualizations"][0]["chart_type"], "quality-gauge");
}
