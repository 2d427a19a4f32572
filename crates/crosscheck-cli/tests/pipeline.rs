use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use crosscheck_cli::{PipelineDeps, PipelineError, PipelineRequest, run_pipeline};
use crosscheck_context::ContextError;
use crosscheck_core::{
    ColumnInfo, Credential, DeclaredRelation, GenerationError, GenerationRequest, QualityBreakdown,
    QueryError, ResultRow, RowSource, ScalarValue, SchemaModel, TableInfo, TableKind,
    TextGenerator,
};
use crosscheck_eval::{Disposition, OutcomeStatus};
use crosscheck_introspect::{Adapter, DiscoveryError, DiscoveryOptions, build_model};
use crosscheck_translate::{SQL_SYSTEM_INSTRUCTION, TranslationMethod};
use tokio_util::sync::CancellationToken;

fn column(name: &str, data_type: &str) -> ColumnInfo {
    ColumnInfo {
        name: name.to_string(),
        data_type: data_type.to_string(),
        is_nullable: name != "id",
        default: None,
        is_primary_key: name == "id",
        is_foreign_key: false,
        distinct_estimate: None,
        null_fraction: None,
    }
}

fn table(name: &str, columns: Vec<ColumnInfo>) -> TableInfo {
    TableInfo {
        schema: "public".to_string(),
        name: name.to_string(),
        table_type: TableKind::Table,
        column_count: columns.len(),
        estimated_rows: 1_000,
        size_bytes: 65_536,
        has_primary_key: true,
        quality_score: 0.0,
        quality_breakdown: QualityBreakdown::default(),
        columns,
    }
}

fn shop_model() -> SchemaModel {
    let tables = vec![
        table(
            "customers",
            vec![column("id", "integer"), column("email", "text")],
        ),
        table(
            "orders",
            vec![
                column("id", "integer"),
                column("customer_id", "integer"),
                column("total", "numeric"),
            ],
        ),
    ];
    let declared = vec![DeclaredRelation {
        constraint_name: "orders_customer_id_fkey".to_string(),
        source_schema: "public".to_string(),
        source_table: "orders".to_string(),
        source_column: "customer_id".to_string(),
        target_schema: "public".to_string(),
        target_table: "customers".to_string(),
        target_column: "id".to_string(),
    }];
    build_model("postgres", Some("shop".to_string()), tables, declared, Vec::new())
        .expect("valid model")
}

struct FakeAdapter {
    unreachable: bool,
}

#[async_trait]
impl Adapter for FakeAdapter {
    fn engine(&self) -> &'static str {
        "fake"
    }

    async fn discover(&self, _opts: &DiscoveryOptions) -> Result<SchemaModel, DiscoveryError> {
        if self.unreachable {
            return Err(DiscoveryError::ConnectionUnreachable(
                "connection refused".to_string(),
            ));
        }
        Ok(shop_model())
    }
}

/// Sample queries get one row; validation queries get counts keyed on the
/// aliases they select.
#[derive(Default)]
struct FakeRows {
    statements: Mutex<Vec<String>>,
}

impl FakeRows {
    fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl RowSource for FakeRows {
    fn engine(&self) -> &'static str {
        "fake"
    }

    async fn fetch_rows(&self, sql: &str, _timeout: Duration) -> Result<Vec<ResultRow>, QueryError> {
        self.statements.lock().unwrap().push(sql.to_string());
        let row = if sql.contains("orphaned_records") {
            ResultRow::new()
                .with("total_records", ScalarValue::Int(100))
                .with("orphaned_records", ScalarValue::Int(3))
                .with("valid_records", ScalarValue::Int(97))
        } else if sql.contains("invalid_records") {
            ResultRow::new()
                .with("total_records", ScalarValue::Int(100))
                .with("invalid_records", ScalarValue::Int(0))
        } else {
            ResultRow::new()
                .with("id", ScalarValue::Int(1))
                .with("customer_id", ScalarValue::Int(1))
        };
        Ok(vec![row])
    }
}

const PROPOSALS: &str = r#"```json
{"validations": [
  {"description": "Orders whose customer does not exist", "type": "referential-integrity",
   "priority": 9, "involved_tables": ["orders", "customers"]},
  {"description": "Orders with unusually large totals", "type": "anomaly",
   "priority": 6, "involved_tables": ["orders"]}
], "insights": ["Every order depends on a customer row."]}
```"#;

const LARGE_TOTALS_SQL: &str = "```sql\n-- totals above the usual range\nselect count(*) as total_records,\n       count(*) filter (where total > 10000) as invalid_records\nfrom public.orders\n```";

struct FakeGenerator {
    sql_reply: String,
    proposal_calls: AtomicUsize,
    sql_calls: AtomicUsize,
}

impl FakeGenerator {
    fn new(sql_reply: &str) -> Self {
        Self {
            sql_reply: sql_reply.to_string(),
            proposal_calls: AtomicUsize::new(0),
            sql_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    fn provider(&self) -> &'static str {
        "fake"
    }

    async fn generate_text(
        &self,
        request: &GenerationRequest,
        _credential: &Credential,
    ) -> Result<String, GenerationError> {
        if request.system_instruction == SQL_SYSTEM_INSTRUCTION {
            self.sql_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.sql_reply.clone())
        } else {
            self.proposal_calls.fetch_add(1, Ordering::SeqCst);
            Ok(PROPOSALS.to_string())
        }
    }
}

struct Harness {
    deps: PipelineDeps,
    rows: Arc<FakeRows>,
    generator: Arc<FakeGenerator>,
}

fn harness(sql_reply: &str) -> Harness {
    let rows = Arc::new(FakeRows::default());
    let generator = Arc::new(FakeGenerator::new(sql_reply));
    Harness {
        deps: PipelineDeps {
            adapter: Arc::new(FakeAdapter { unreachable: false }),
            rows: rows.clone(),
            generator: generator.clone(),
        },
        rows,
        generator,
    }
}

fn request(focus: &str) -> PipelineRequest {
    PipelineRequest {
        credential: Some(Credential::new("test-key")),
        business_context: Some("Online shop".to_string()),
        ..PipelineRequest::new(focus)
    }
}

#[tokio::test]
async fn runs_every_stage_and_reports_per_validation() -> Result<()> {
    let h = harness(LARGE_TOTALS_SQL);
    let report = run_pipeline(&h.deps, request("orders"), &CancellationToken::new()).await?;
    let summary = &report.summary;

    assert_eq!(summary.focus_table, "public.orders");
    assert_eq!(summary.total_validations, 2);
    assert_eq!(summary.executed, 2);
    assert_eq!(summary.successful, 2);
    assert_eq!(summary.rejected_for_safety, 0);
    assert_eq!(summary.with_issues, 1);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.total_issues, 3);
    assert!(!summary.cancelled);
    assert_eq!(summary.insights, vec!["Every order depends on a customer row.".to_string()]);

    let orphan = summary
        .validations
        .iter()
        .find(|v| v.method == TranslationMethod::Template)
        .expect("template validation");
    assert_eq!(orphan.status, Some(OutcomeStatus::IssuesFound));
    assert_eq!(orphan.quality_percentage, Some(97.0));
    assert_eq!(orphan.disposition, Disposition::Executed);
    assert!(orphan.sql.is_none());

    let generated = summary
        .validations
        .iter()
        .find(|v| v.method == TranslationMethod::Generated)
        .expect("generated validation");
    assert_eq!(generated.status, Some(OutcomeStatus::Pass));

    assert_eq!(h.generator.proposal_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.generator.sql_calls.load(Ordering::SeqCst), 1);

    assert_eq!(report.dashboard.focus_table, "public.orders");
    assert_eq!(report.dashboard.visualizations[0].id, "overview");
    assert!(
        report
            .dashboard
            .visualizations
            .iter()
            .any(|viz| viz.status == Some(OutcomeStatus::IssuesFound))
    );
    assert_eq!(report.dashboard.layout.rows[0].visualization_ids, vec!["overview".to_string()]);
    Ok(())
}

#[tokio::test]
async fn include_sql_echoes_the_executed_statements() -> Result<()> {
    let h = harness(LARGE_TOTALS_SQL);
    let request = PipelineRequest {
        include_sql: true,
        ..request("public.orders")
    };
    let report = run_pipeline(&h.deps, request, &CancellationToken::new()).await?;

    let executed = h.rows.statements();
    for entry in &report.summary.validations {
        let sql = entry.sql.as_deref().expect("sql echoed");
        assert!(executed.iter().any(|statement| statement == sql));
    }
    Ok(())
}

#[tokio::test]
async fn unsafe_generated_sql_is_reported_but_never_executed() -> Result<()> {
    let h = harness("```sql\nselect count(*) from public.orders; drop table public.orders\n```");
    let report = run_pipeline(&h.deps, request("orders"), &CancellationToken::new()).await?;

    assert_eq!(report.summary.total_validations, 2);
    assert_eq!(report.summary.executed, 1);
    assert_eq!(report.summary.rejected_for_safety, 1);
    let rejected = report
        .summary
        .validations
        .iter()
        .find(|v| v.disposition == Disposition::RejectedForSafety)
        .expect("rejected entry");
    assert!(rejected.note.as_deref().unwrap_or_default().starts_with("rejected:"));

    assert!(
        h.rows
            .statements()
            .iter()
            .all(|sql| !sql.to_ascii_lowercase().contains("drop"))
    );
    Ok(())
}

#[tokio::test]
async fn missing_credential_stops_the_run_before_execution() {
    let h = harness(LARGE_TOTALS_SQL);
    let request = PipelineRequest {
        credential: None,
        ..request("orders")
    };
    let err = run_pipeline(&h.deps, request, &CancellationToken::new())
        .await
        .expect_err("no proposals without a credential");

    assert!(matches!(
        err,
        PipelineError::Generation(GenerationError::MissingCredential)
    ));
    assert_eq!(h.generator.proposal_calls.load(Ordering::SeqCst), 0);
    assert!(
        h.rows
            .statements()
            .iter()
            .all(|sql| !sql.contains("orphaned_records"))
    );
}

#[tokio::test]
async fn unknown_focus_table_is_a_context_error() {
    let h = harness(LARGE_TOTALS_SQL);
    let err = run_pipeline(&h.deps, request("shipments"), &CancellationToken::new())
        .await
        .expect_err("unknown focus");

    assert!(matches!(
        err,
        PipelineError::Context(ContextError::FocusTableNotFound(_))
    ));
    assert!(h.rows.statements().is_empty());
}

#[tokio::test]
async fn discovery_failure_aborts_the_run() {
    let h = harness(LARGE_TOTALS_SQL);
    let deps = PipelineDeps {
        adapter: Arc::new(FakeAdapter { unreachable: true }),
        ..h.deps.clone()
    };
    let err = run_pipeline(&deps, request("orders"), &CancellationToken::new())
        .await
        .expect_err("unreachable database");

    assert!(matches!(
        err,
        PipelineError::Discovery(DiscoveryError::ConnectionUnreachable(_))
    ));
    assert!(err.to_string().contains("connection refused"));
}

#[tokio::test]
async fn cancellation_before_discovery_names_the_stage() {
    let h = harness(LARGE_TOTALS_SQL);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = run_pipeline(&h.deps, request("orders"), &cancel)
        .await
        .expect_err("cancelled run");

    assert!(matches!(err, PipelineError::Cancelled { stage: "discovery" }));
    assert!(h.rows.statements().is_empty());
}
