use std::fmt::Write as _;

use crosscheck_context::{AnalysisContext, SampleStrategy};
use crosscheck_core::{ColumnInfo, GenerationRequest, ResultRow, ScalarValue, TableInfo};

/// Limits applied while rendering the context into a prompt.
#[derive(Debug, Clone)]
pub struct PromptOptions {
    pub model: String,
    pub temperature: f32,
    pub max_columns_per_table: usize,
    pub sample_rows_per_table: usize,
    pub max_value_chars: usize,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.3,
            max_columns_per_table: 25,
            sample_rows_per_table: 5,
            max_value_chars: 60,
        }
    }
}

pub const SYSTEM_INSTRUCTION: &str = "You are a senior data-quality engineer. \
You propose cross-table data-quality validations in natural language. \
Never write SQL. Answer with a single JSON object and nothing else.";

const TYPE_LABELS: &str = "referential-integrity, temporal-consistency, status-consistency, \
uniqueness, format, anomaly, business-rule";

/// Number of proposals to ask for: `3 + round(7 * complexity)`.
pub fn requested_count(complexity: f64) -> usize {
    3 + (7.0 * complexity.clamp(0.0, 1.0)).round() as usize
}

/// Output-token budget, growing with context complexity.
pub fn token_budget(complexity: f64) -> u32 {
    2048 + (6144.0 * complexity.clamp(0.0, 1.0)).round() as u32
}

pub fn build_request(context: &AnalysisContext, opts: &PromptOptions) -> GenerationRequest {
    GenerationRequest {
        model: opts.model.clone(),
        system_instruction: SYSTEM_INSTRUCTION.to_string(),
        prompt: render_prompt(context, opts),
        temperature: opts.temperature,
        max_output_tokens: token_budget(context.complexity),
    }
}

pub fn render_prompt(context: &AnalysisContext, opts: &PromptOptions) -> String {
    let mut out = String::new();
    let count = requested_count(context.complexity);

    let _ = writeln!(out, "# Focus table: {}", context.focus_table);
    write_table(&mut out, &context.focus, opts, "");

    if !context.related.is_empty() {
        let _ = writeln!(out, "\n# Related tables");
        for related in &context.related {
            let _ = writeln!(
                out,
                "- {} ({}, importance {}, {} hop{}) joined by {}",
                related.table,
                related.relation_type.as_str(),
                related.importance,
                related.hops,
                if related.hops == 1 { "" } else { "s" },
                related.join_condition
            );
            write_table(&mut out, &related.info, opts, "  ");
        }
    }

    if !context.relations.is_empty() {
        let _ = writeln!(out, "\n# Relationships");
        for relation in &context.relations {
            let opportunities: Vec<&str> =
                relation.opportunities.iter().map(|o| o.as_str()).collect();
            let _ = writeln!(
                out,
                "- {} [{}, confidence {:.2}; {}]",
                relation.join_condition(),
                relation.kind.as_str(),
                relation.confidence,
                opportunities.join(", ")
            );
        }
    }

    if !context.samples.is_empty() {
        let _ = writeln!(out, "\n# Sample rows");
        for sample in &context.samples {
            let strategy = match &sample.strategy {
                SampleStrategy::Stratified { key } => format!("stratified by {key}"),
                SampleStrategy::Uniform => "uniform".to_string(),
            };
            let shown = sample.rows.len().min(opts.sample_rows_per_table);
            let _ = writeln!(
                out,
                "{} ({strategy}, showing {shown} of {} rows):",
                sample.table,
                sample.rows.len()
            );
            for row in sample.rows.iter().take(shown) {
                let _ = writeln!(out, "  {}", render_row(row, opts.max_value_chars));
            }
        }
    }

    if let Some(business) = &context.business_context {
        let _ = writeln!(out, "\n# Business context\n{business}");
    }

    let _ = writeln!(
        out,
        "\n# Task\nPropose exactly {count} cross-table data-quality validations for {focus}. \
Each must involve the focus table and reference tables by their qualified names.\n\
Respond with JSON shaped as:\n\
{{\"validations\": [{{\"description\": \"...\", \"type\": \"one of: {TYPE_LABELS}\", \
\"priority\": 1-10, \"complexity\": \"low|medium|high\", \"involved_tables\": [\"schema.table\"], \
\"involved_relationships\": [{{\"from_table\": \"...\", \"to_table\": \"...\", \"join_condition\": \"...\"}}], \
\"relevance\": 0.0-1.0}}], \"insights\": [\"...\"]}}",
        focus = context.focus_table
    );
    out
}

fn write_table(out: &mut String, table: &TableInfo, opts: &PromptOptions, indent: &str) {
    let _ = writeln!(
        out,
        "{indent}rows ~{}, quality {:.1}/100",
        table.estimated_rows.max(0),
        table.quality_score
    );
    for column in table.columns.iter().take(opts.max_columns_per_table) {
        let _ = writeln!(out, "{indent}  - {}", describe_column(column));
    }
    if table.columns.len() > opts.max_columns_per_table {
        let _ = writeln!(
            out,
            "{indent}  ... {} more columns",
            table.columns.len() - opts.max_columns_per_table
        );
    }
}

fn describe_column(column: &ColumnInfo) -> String {
    let mut text = format!("{} {}", column.name, column.data_type);
    if column.is_primary_key {
        text.push_str(" primary key");
    }
    if column.is_foreign_key {
        text.push_str(" foreign key");
    }
    if !column.is_nullable {
        text.push_str(" not null");
    }
    if let Some(fraction) = column.null_fraction.filter(|f| *f > 0.0) {
        let _ = write!(text, " ({:.0}% null)", fraction * 100.0);
    }
    text
}

fn render_row(row: &ResultRow, max_chars: usize) -> String {
    row.iter()
        .map(|(column, value)| format!("{column}={}", truncate_value(value, max_chars)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn truncate_value(value: &ScalarValue, max_chars: usize) -> String {
    let text = value.to_string();
    if text.chars().count() <= max_chars {
        return text;
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_and_budget_scale_with_complexity() {
        assert_eq!(requested_count(0.0), 3);
        assert_eq!(requested_count(0.5), 7);
        assert_eq!(requested_count(1.0), 10);
        assert_eq!(requested_count(4.0), 10);
        assert!(token_budget(1.0) > token_budget(0.1));
        assert_eq!(token_budget(1.0), 8192);
    }

    #[test]
    fn long_values_are_truncated() {
        let value = ScalarValue::Text("x".repeat(100));
        let text = truncate_value(&value, 10);
        assert_eq!(text, format!("{}...", "x".repeat(10)));
    }
}
