//! Generation-service fallback for proposals no template covers.

use std::fmt::Write as _;

use once_cell::sync::Lazy;
use regex::Regex;

use crosscheck_core::{GenerationRequest, SchemaModel, ValidationProposal};

use crate::resolve::ResolvedProposal;

pub const SQL_SYSTEM_INSTRUCTION: &str = "You translate one data-quality check into a single \
PostgreSQL query. Emit read-only SQL only: one SELECT or WITH statement, never data changes, DDL, \
or several statements. Explain the query with -- comments and write no prose outside the SQL. \
Return one row with the counts aliased total_records and invalid_records.";

const MAX_COLUMNS_PER_TABLE: usize = 40;
const MAX_RELATIONSHIPS: usize = 10;

static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").expect("valid fence regex"));

static SQL_START_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:--|(?:with|select|explain|show)\b)").expect("valid sql start regex")
});

#[derive(Debug, Clone)]
pub struct GenerativeOptions {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerativeOptions {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.1,
            max_output_tokens: 1024,
        }
    }
}

pub fn build_sql_request(
    proposal: &ValidationProposal,
    resolved: &ResolvedProposal<'_>,
    model: &SchemaModel,
    options: &GenerativeOptions,
) -> GenerationRequest {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Check: {}", proposal.description.trim());
    let _ = writeln!(prompt, "Type: {}", proposal.validation_type.as_str());

    let _ = writeln!(prompt, "\nTables:");
    if resolved.tables.is_empty() {
        for name in &proposal.involved_tables {
            let _ = writeln!(prompt, "- {name} (columns unknown)");
        }
    }
    for table in &resolved.tables {
        let columns: Vec<String> = table
            .columns
            .iter()
            .take(MAX_COLUMNS_PER_TABLE)
            .map(|column| format!("{} {}", column.name, column.data_type))
            .collect();
        let _ = writeln!(prompt, "- {} ({})", table.qualified_name(), columns.join(", "));
    }

    let mut joins: Vec<String> = proposal
        .involved_relationships
        .iter()
        .map(|relationship| relationship.join_condition.trim().to_string())
        .filter(|condition| !condition.is_empty())
        .collect();
    for table in &resolved.tables {
        for relation in model.relations_touching(&table.qualified_name()) {
            let condition = relation.join_condition();
            if !joins.contains(&condition) {
                joins.push(condition);
            }
        }
    }
    if !joins.is_empty() {
        let _ = writeln!(prompt, "\nRelationships:");
        for condition in joins.iter().take(MAX_RELATIONSHIPS) {
            let _ = writeln!(prompt, "- {condition}");
        }
    }

    let _ = writeln!(
        prompt,
        "\nWrite the query. Qualify tables with their schema. Output SQL only."
    );

    GenerationRequest {
        model: options.model.clone(),
        system_instruction: SQL_SYSTEM_INSTRUCTION.to_string(),
        prompt,
        temperature: options.temperature,
        max_output_tokens: options.max_output_tokens,
    }
}

/// Pull the SQL out of a model reply: the first fenced block if any,
/// otherwise the lines from the first SQL-looking line up to the first
/// blank line after code.
pub fn extract_sql(text: &str) -> Option<String> {
    if let Some(block) = FENCE_RE
        .captures(text)
        .and_then(|found| found.get(1))
        .map(|body| body.as_str().trim())
        .filter(|body| !body.is_empty())
    {
        return Some(block.to_string());
    }

    let start = SQL_START_RE.find(text)?.start();
    let mut lines = Vec::new();
    let mut seen_code = false;
    for line in text[start..].lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if seen_code {
                break;
            }
            continue;
        }
        if !trimmed.starts_with("--") {
            seen_code = true;
        }
        lines.push(line.trim_end());
    }

    let sql = lines.join("\n").trim().to_string();
    (seen_code && !sql.is_empty()).then_some(sql)
}
