use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crosscheck_cli::{PipelineConfig, PipelineReport};
use crosscheck_core::{RedactedConnection, SchemaModel};

use super::{RegistryError, RegistryResult};

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub command: &'static str,
    pub engine: String,
    pub model_version: String,
    pub focus_table: Option<String>,
    pub include_sql: bool,
    pub run_dir: PathBuf,
    pub config: PipelineConfig,
    pub connection: RedactedConnection,
}

/// JSON config written to each run directory.
#[derive(Debug, Serialize)]
pub struct RunConfig {
    pub run_id: String,
    pub started_at: String,
    pub command: String,
    pub engine: String,
    pub model_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_table: Option<String>,
    pub include_sql: bool,
    pub options: PipelineConfig,
    pub connection: RedactedConnection,
    pub git: GitInfo,
}

/// Git metadata for reproducibility.
#[derive(Debug, Serialize)]
pub struct GitInfo {
    pub commit: Option<String>,
    pub dirty: Option<bool>,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub logs_path: PathBuf,
    pub schema_path: PathBuf,
    pub summary_path: PathBuf,
    pub dashboard_path: PathBuf,
    pub report_path: PathBuf,
}

pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let root = ctx.run_dir.join(format!("{timestamp}__run_{}", ctx.run_id));

    create_dir_all(&root)?;

    let config_path = root.join("config.json");
    let logs_path = root.join("logs.ndjson");

    let config = RunConfig {
        run_id: ctx.run_id.clone(),
        started_at: ctx.started_at.to_rfc3339(),
        command: ctx.command.to_string(),
        engine: ctx.engine.clone(),
        model_version: ctx.model_version.clone(),
        focus_table: ctx.focus_table.clone(),
        include_sql: ctx.include_sql,
        options: ctx.config.clone(),
        connection: ctx.connection.clone(),
        git: collect_git_info(),
    };

    write_json(&config_path, &config)?;

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&logs_path)?;

    Ok(RunPaths {
        logs_path,
        schema_path: root.join("schema_model.json"),
        summary_path: root.join("summary.json"),
        dashboard_path: root.join("dashboard.json"),
        report_path: root.join("report.md"),
        root,
    })
}

pub fn write_schema(
    paths: &RunPaths,
    schema: &SchemaModel,
    out_path: Option<&Path>,
) -> RegistryResult<()> {
    write_json(&paths.schema_path, schema)?;

    if let Some(out_path) = out_path {
        if let Some(parent) = out_path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)?;
            }
        }
        write_json(out_path, schema)?;
    }

    Ok(())
}

/// `summary.json`, `dashboard.json` and `report.md`.
pub fn write_pipeline_report(
    paths: &RunPaths,
    report: &PipelineReport,
    markdown: &str,
) -> RegistryResult<()> {
    write_json(&paths.summary_path, &report.summary)?;
    write_json(&paths.dashboard_path, &report.dashboard)?;

    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&paths.report_path)?;
    file.write_all(markdown.as_bytes())?;
    Ok(())
}

pub fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            } else {
                None
            }
        })
        .filter(|value| !value.is_empty());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| !output.stdout.is_empty());

    GitInfo { commit, dirty }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> RegistryResult<()> {
    let file = OpenOptions::new().create(true).truncate(true).write(true).open(path)?;
    serde_json::to_writer_pretty(file, value).map_err(RegistryError::from)
}
