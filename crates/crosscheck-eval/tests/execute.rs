mod support;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crosscheck_core::{RowSource, ValidationType};
use crosscheck_eval::{
    Disposition, ExecutionEngine, ExecutionOptions, ExecutionStatus, OutcomeStatus, StageTimings,
    render_report, summarize,
};
use tokio_util::sync::CancellationToken;

use support::{ScriptedRows, placeholder, proposal, translated};

#[tokio::test]
async fn one_failing_statement_does_not_affect_siblings() {
    let source = ScriptedRows::with_delay(Duration::from_millis(5));
    let batch = vec![
        translated(proposal(1, ValidationType::Uniqueness, 5), "select 1 as clean"),
        translated(proposal(2, ValidationType::Uniqueness, 5), "select * from boom"),
        translated(proposal(3, ValidationType::Uniqueness, 5), "select 'some' as x"),
        translated(proposal(4, ValidationType::Uniqueness, 5), "select 'explode' as x"),
    ];

    let result = ExecutionEngine::default()
        .execute(source, batch, &CancellationToken::new())
        .await;

    assert_eq!(result.executed.len(), 4);
    let statuses: Vec<OutcomeStatus> = result.executed.iter().map(|e| e.outcome.status).collect();
    assert_eq!(
        statuses,
        vec![
            OutcomeStatus::Pass,
            OutcomeStatus::Error,
            OutcomeStatus::IssuesFound,
            OutcomeStatus::Error,
        ]
    );
    assert!(result.executed[1].error.as_deref().unwrap().contains("boom"));
    assert!(result.executed[3].error.as_deref().unwrap().contains("driver exploded"));
    assert_eq!(result.executed[3].execution_status, ExecutionStatus::Error);
    assert!(!result.cancelled);
}

#[tokio::test]
async fn concurrency_never_exceeds_ceiling() {
    let source = ScriptedRows::with_delay(Duration::from_millis(20));
    let batch = (1..=12)
        .map(|n| translated(proposal(n, ValidationType::Anomaly, 5), "select 1"))
        .collect();
    let engine = ExecutionEngine::new(ExecutionOptions {
        max_concurrency: 3,
        ..ExecutionOptions::default()
    });

    let result = engine
        .execute(source.clone(), batch, &CancellationToken::new())
        .await;

    assert_eq!(result.executed.len(), 12);
    assert!(source.peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(source.calls.load(Ordering::SeqCst), 12);
    let sequences: Vec<u32> = result
        .executed
        .iter()
        .map(|e| e.translated.proposal.sequence)
        .collect();
    assert_eq!(sequences, (1..=12).collect::<Vec<_>>());
}

#[tokio::test]
async fn rejected_statements_never_reach_the_database() {
    let source = ScriptedRows::with_delay(Duration::ZERO);
    let batch = vec![
        translated(proposal(1, ValidationType::ReferentialIntegrity, 9), "select 'some' as x"),
        translated(
            proposal(2, ValidationType::ReferentialIntegrity, 9),
            "SELECT id FROM orders; DROP TABLE orders;",
        ),
        placeholder(proposal(3, ValidationType::Format, 4)),
    ];

    let result = ExecutionEngine::default()
        .execute(source.clone(), batch, &CancellationToken::new())
        .await;

    assert_eq!(result.executed.len(), 1);
    assert_eq!(result.skipped.len(), 2);
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);

    let summary = summarize("public.orders", &result, &[], StageTimings::default(), true);
    assert_eq!(summary.executed, 1);
    assert_eq!(summary.total_validations, 3);
    assert_eq!(summary.rejected_for_safety, 1);
    assert_eq!(summary.manual_review, 1);
    let dispositions: Vec<Disposition> = summary.validations.iter().map(|v| v.disposition).collect();
    assert_eq!(
        dispositions,
        vec![
            Disposition::Executed,
            Disposition::RejectedForSafety,
            Disposition::ManualReview,
        ]
    );
    assert!(summary.validations[1]
        .note
        .as_deref()
        .unwrap()
        .contains("statement chaining before 'drop'"));
}

#[tokio::test]
async fn statement_timeout_is_an_error_outcome() {
    let source = ScriptedRows::with_delay(Duration::ZERO);
    let engine = ExecutionEngine::new(ExecutionOptions {
        max_concurrency: 2,
        statement_timeout: Duration::from_millis(10),
    });
    let batch = vec![
        translated(proposal(1, ValidationType::Anomaly, 5), "select 'hang' as x"),
        translated(proposal(2, ValidationType::Anomaly, 5), "select 1"),
    ];

    let result = engine.execute(source, batch, &CancellationToken::new()).await;

    assert_eq!(result.executed[0].outcome.status, OutcomeStatus::Error);
    assert!(result.executed[0].error.as_deref().unwrap().contains("timed out"));
    assert_eq!(result.executed[1].outcome.status, OutcomeStatus::Pass);
}

#[tokio::test]
async fn cancellation_keeps_completed_results() {
    let source = ScriptedRows::with_delay(Duration::from_millis(50));
    let engine = ExecutionEngine::new(ExecutionOptions {
        max_concurrency: 1,
        ..ExecutionOptions::default()
    });
    let batch = vec![
        translated(proposal(1, ValidationType::Anomaly, 5), "select 1"),
        translated(proposal(2, ValidationType::Anomaly, 5), "select 'hang' as x"),
        translated(proposal(3, ValidationType::Anomaly, 5), "select 2"),
        translated(proposal(4, ValidationType::Anomaly, 5), "select 3"),
    ];
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let source: Arc<dyn RowSource> = source;
    let result = engine.execute(source, batch, &cancel).await;

    assert!(result.cancelled);
    assert_eq!(result.executed.len(), 2);
    assert_eq!(result.executed[0].outcome.status, OutcomeStatus::Pass);
    assert_eq!(result.executed[1].error.as_deref(), Some("cancelled"));
    assert_eq!(result.not_executed.len(), 2);

    let summary = summarize("public.orders", &result, &[], StageTimings::default(), false);
    assert!(summary.cancelled);
    assert_eq!(summary.total_validations, 4);
    assert_eq!(summary.not_executed, 2);
    assert!(summary.validations.iter().all(|v| v.sql.is_none()));
    assert!(render_report(&summary).contains("cancelled: true"));
}

#[tokio::test]
async fn summary_buckets_and_recommendations() {
    let source = ScriptedRows::with_delay(Duration::ZERO);
    let batch = vec![
        translated(proposal(1, ValidationType::ReferentialIntegrity, 9), "select 'some' as x"),
        translated(proposal(2, ValidationType::TemporalConsistency, 6), "select 'some' as x"),
        translated(proposal(3, ValidationType::Uniqueness, 3), "select 'dirty' as x"),
        translated(proposal(4, ValidationType::Anomaly, 6), "select 1"),
        translated(proposal(5, ValidationType::Anomaly, 6), "select 'empty' as x"),
    ];

    let result = ExecutionEngine::default()
        .execute(source, batch, &CancellationToken::new())
        .await;
    let summary = summarize(
        "public.orders",
        &result,
        &["orders depend on customers".to_string()],
        StageTimings::default(),
        false,
    );

    assert_eq!(summary.passed, 1);
    assert_eq!(summary.with_issues, 2);
    assert_eq!(summary.critical, 1);
    assert_eq!(summary.no_data, 1);
    assert_eq!(summary.total_issues, 70);
    // (95 + 95 + 40 + 100) / 4
    assert_eq!(summary.average_quality, Some(82.5));

    let high: Vec<&str> = summary.high_priority.iter().map(|i| i.proposal_id.as_str()).collect();
    assert_eq!(high, vec!["val_001", "val_003"]);
    let medium: Vec<&str> = summary.medium_priority.iter().map(|i| i.proposal_id.as_str()).collect();
    assert_eq!(medium, vec!["val_002"]);

    assert!(summary.recommendations[0].starts_with("Address 2 high-priority issue(s)"));
    assert!(summary
        .recommendations
        .iter()
        .any(|line| line.starts_with("Referential integrity problems in 1 check(s)")));
    assert!(summary
        .recommendations
        .iter()
        .any(|line| line.starts_with("Temporal consistency problems")));

    let report = render_report(&summary);
    assert!(report.starts_with("# Data Quality Report: public.orders"));
    assert!(report.contains("## High-priority issues"));
    assert!(report.contains("- orders depend on customers"));
    assert!(!report.contains("## SQL"));
}
