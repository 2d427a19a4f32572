mod registry;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use crosscheck_cli::{
    ConfigError, PipelineConfig, PipelineDeps, PipelineError, PipelineRequest, run_pipeline,
};
use crosscheck_core::{Credential, GenerationError, MODEL_VERSION, redact_connection_string};
use crosscheck_eval::{dashboard_json_schema, render_report};
use crosscheck_introspect::{Adapter, DiscoveryError, PostgresAdapter};
use crosscheck_llm::GeminiClient;
use registry::{RunContext, init_run_logging, start_run, write_pipeline_report, write_schema};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const API_KEY_ENV: &str = "CROSSCHECK_API_KEY";

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unsupported engine: {0}")]
    UnsupportedEngine(String),
}

#[derive(Parser, Debug)]
#[command(name = "crosscheck", version, about = "Cross-table data-quality validation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover, propose, translate and execute validations for one table.
    Run(RunArgs),
    /// Discover the schema model only and write schema_model.json.
    Discover(DiscoverArgs),
    /// Print the JSON Schema of dashboard.json.
    DashboardSchema(DashboardSchemaArgs),
}

#[derive(Args, Debug)]
struct ConnectionArgs {
    /// Database connection string (flag form).
    #[arg(long, value_name = "CONNECTION_STRING", conflicts_with = "conn_pos")]
    conn: Option<String>,
    /// Database connection string (positional form).
    #[arg(value_name = "CONNECTION_STRING", required_unless_present = "conn")]
    conn_pos: Option<String>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    connection: ConnectionArgs,
    /// Focus table, bare or schema-qualified.
    #[arg(long)]
    focus: String,
    /// Free-text business context for the proposer.
    #[arg(long)]
    context: Option<String>,
    /// Generation-service key; falls back to CROSSCHECK_API_KEY.
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,
    /// Echo translated SQL in summary.json and report.md.
    #[arg(long, default_value_t = false)]
    include_sql: bool,
    /// Config file (defaults to ./crosscheck.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output directory for runs.
    #[arg(long, default_value = "runs")]
    run_dir: PathBuf,
    /// Model for proposals and SQL generation.
    #[arg(long)]
    model: Option<String>,
    /// Statements executed at the same time.
    #[arg(long)]
    max_concurrency: Option<usize>,
    /// Per-statement timeout in seconds.
    #[arg(long)]
    statement_timeout_secs: Option<u64>,
}

#[derive(Args, Debug)]
struct DiscoverArgs {
    #[command(flatten)]
    connection: ConnectionArgs,
    /// Output directory for runs.
    #[arg(long, default_value = "runs")]
    run_dir: PathBuf,
    /// Optional extra output path for schema_model.json.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Config file (defaults to ./crosscheck.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Schema name(s) to include.
    #[arg(long, value_name = "SCHEMA")]
    schema: Vec<String>,
    /// Include system schemas such as pg_catalog.
    #[arg(long, default_value_t = false)]
    include_system_schemas: bool,
}

#[derive(Args, Debug)]
struct DashboardSchemaArgs {
    /// Write to a file instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run_validation(args).await,
        Command::Discover(args) => run_discover(args).await,
        Command::DashboardSchema(args) => print_dashboard_schema(args),
    }
}

async fn run_validation(args: RunArgs) -> Result<(), CliError> {
    let RunArgs {
        connection,
        focus,
        context,
        api_key,
        include_sql,
        config,
        run_dir,
        model,
        max_concurrency,
        statement_timeout_secs,
    } = args;

    let conn = resolve_conn(connection)?;
    let engine = detect_engine(&conn)?;

    let mut config = PipelineConfig::load_or_default(config.as_deref())?;
    if let Some(model) = model {
        config.generation.model = model;
    }
    if let Some(max_concurrency) = max_concurrency {
        config.execution.max_concurrency = max_concurrency;
    }
    if let Some(seconds) = statement_timeout_secs {
        config.execution.statement_timeout_secs = seconds;
    }
    config.validate()?;

    let credential = api_key
        .or_else(|| std::env::var(API_KEY_ENV).ok())
        .map(Credential::new)
        .filter(|credential| !credential.is_blank());

    let run_id = Uuid::new_v4().to_string();
    let run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        command: "run",
        engine: engine.to_string(),
        model_version: MODEL_VERSION.to_string(),
        focus_table: Some(focus.clone()),
        include_sql,
        run_dir,
        config: config.clone(),
        connection: redact_connection_string(&conn),
    };

    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path)?;

    tracing::info!(event = "run_started", run_id = %run_id, engine = %engine, focus = %focus);

    let timer = Instant::now();
    let pool = connect(&conn, config.execution.max_concurrency).await?;
    let adapter = PostgresAdapter::new(pool);
    let deps = PipelineDeps {
        rows: Arc::new(adapter.row_source()),
        adapter: Arc::new(adapter),
        generator: Arc::new(GeminiClient::new(config.gemini_config())?),
    };

    let request = PipelineRequest {
        focus_table: focus,
        business_context: context,
        credential,
        include_sql,
        options: config.pipeline_options(),
    };

    let cancel = CancellationToken::new();
    let watcher = spawn_interrupt_watcher(cancel.clone());
    let result = run_pipeline(&deps, request, &cancel).await;
    watcher.abort();

    let report = match result {
        Ok(report) => report,
        Err(err) => {
            tracing::error!(
                event = "run_finished",
                status = "failed",
                error = %err,
                duration_ms = timer.elapsed().as_millis() as u64
            );
            return Err(err.into());
        }
    };

    write_schema(&run_paths, &report.schema, None)?;
    write_pipeline_report(&run_paths, &report, &render_report(&report.summary))?;
    tracing::info!(event = "report_written", path = %run_paths.root.display());

    let summary = &report.summary;
    println!("run directory: {}", run_paths.root.display());
    println!(
        "validations: {} executed: {} passed: {} with issues: {} critical: {} rejected: {}",
        summary.total_validations,
        summary.executed,
        summary.passed,
        summary.with_issues,
        summary.critical,
        summary.rejected_for_safety
    );
    if let Some(quality) = summary.average_quality {
        println!("average quality: {quality:.1}%");
    }

    let status = if summary.cancelled { "partial" } else { "success" };
    tracing::info!(
        event = "run_finished",
        status = status,
        duration_ms = timer.elapsed().as_millis() as u64
    );

    Ok(())
}

async fn run_discover(args: DiscoverArgs) -> Result<(), CliError> {
    let DiscoverArgs {
        connection,
        run_dir,
        out,
        config,
        schema,
        include_system_schemas,
    } = args;

    let conn = resolve_conn(connection)?;
    let engine = detect_engine(&conn)?;

    let mut config = PipelineConfig::load_or_default(config.as_deref())?;
    if !schema.is_empty() {
        config.discovery.schemas = Some(schema);
    }
    if include_system_schemas {
        config.discovery.include_system_schemas = true;
    }

    let run_id = Uuid::new_v4().to_string();
    let run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        command: "discover",
        engine: engine.to_string(),
        model_version: MODEL_VERSION.to_string(),
        focus_table: None,
        include_sql: false,
        run_dir,
        config: config.clone(),
        connection: redact_connection_string(&conn),
    };

    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path)?;

    tracing::info!(event = "run_started", run_id = %run_id, engine = %engine);

    let timer = Instant::now();
    let pool = connect(&conn, 1).await?;
    let adapter = PostgresAdapter::new(pool);
    let model = adapter.discover(&config.pipeline_options().discovery).await?;

    write_schema(&run_paths, &model, out.as_deref())?;
    tracing::info!(event = "schema_written", path = %run_paths.schema_path.display());
    println!("{}", run_paths.schema_path.display());

    tracing::info!(
        event = "run_finished",
        status = "success",
        duration_ms = timer.elapsed().as_millis() as u64
    );

    Ok(())
}

fn print_dashboard_schema(args: DashboardSchemaArgs) -> Result<(), CliError> {
    let schema = serde_json::to_string_pretty(&dashboard_json_schema())?;
    match args.out {
        Some(path) => std::fs::write(path, schema)?,
        None => println!("{schema}"),
    }
    Ok(())
}

fn resolve_conn(args: ConnectionArgs) -> Result<String, CliError> {
    match (args.conn, args.conn_pos) {
        (Some(value), None) | (None, Some(value)) => Ok(value),
        (Some(_), Some(_)) => Err(CliError::InvalidConfig(
            "use either --conn or positional connection string".to_string(),
        )),
        (None, None) => Err(CliError::InvalidConfig(
            "connection string is required".to_string(),
        )),
    }
}

fn detect_engine(conn: &str) -> Result<&'static str, CliError> {
    if conn.starts_with("postgres://") || conn.starts_with("postgresql://") {
        Ok("postgres")
    } else {
        Err(CliError::UnsupportedEngine(
            redact_connection_string(conn).redacted,
        ))
    }
}

/// One connection per execution worker plus one for sampling.
async fn connect(conn: &str, workers: usize) -> Result<PgPool, CliError> {
    let pool = PgPoolOptions::new()
        .max_connections(workers.max(1) as u32 + 1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(conn)
        .await?;
    Ok(pool)
}

fn spawn_interrupt_watcher(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!(event = "run_interrupted");
            cancel.cancel();
        }
    })
}
