//! Dialect cleanup for statements that passed the gate.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crosscheck_core::{SchemaModel, is_reserved_word, quote_ident};

use crate::lexer::{Segment, SegmentKind, code_only, segments};

static NULL_FALLBACK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(isnull|ifnull|nvl)\s*\(").expect("valid coalesce regex"));

static LEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\blen\s*\(").expect("valid len regex"));

static NOW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(getdate\s*\(\s*\)|sysdate(\s*\(\s*\))?)").expect("valid now regex")
});

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_$]*").expect("valid identifier regex"));

static LEADING_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_]+").expect("valid leading word regex"));

/// Identifiers from the schema that cannot be written bare.
#[derive(Debug, Default)]
struct QuotingRules {
    /// Exact-case names that are not all lowercase.
    mixed_case: BTreeSet<String>,
    /// Lowercased names that are reserved words.
    reserved: BTreeSet<String>,
}

impl QuotingRules {
    fn from_model(model: &SchemaModel) -> Self {
        let mut rules = QuotingRules::default();
        let mut add = |name: &str| {
            if name.chars().any(|ch| ch.is_ascii_uppercase()) {
                rules.mixed_case.insert(name.to_string());
            } else if is_reserved_word(name) {
                rules.reserved.insert(name.to_string());
            }
        };
        for table in &model.tables {
            add(&table.schema);
            add(&table.name);
            for column in &table.columns {
                add(&column.name);
            }
        }
        rules
    }

    fn is_empty(&self) -> bool {
        self.mixed_case.is_empty() && self.reserved.is_empty()
    }
}

/// Rewrite an accepted statement for Postgres and cap its row count.
///
/// Only code is touched; comments, literals and already-quoted identifiers
/// pass through unchanged.
pub fn optimize_sql(sql: &str, model: &SchemaModel, max_rows: u32) -> String {
    let rules = QuotingRules::from_model(model);
    let mut out = String::with_capacity(sql.len() + 16);
    for segment in segments(sql) {
        if segment.kind == SegmentKind::Code {
            let text = normalize_functions(segment.text);
            if rules.is_empty() {
                out.push_str(&text);
            } else {
                out.push_str(&quote_identifiers(&text, &rules));
            }
        } else {
            out.push_str(segment.text);
        }
    }

    let mut optimized = strip_trailing_semicolons(&out);
    if needs_row_cap(&optimized) {
        optimized.push_str(&format!("\nlimit {max_rows}"));
    }
    optimized
}

fn normalize_functions(code: &str) -> String {
    let code = NULL_FALLBACK_RE.replace_all(code, "coalesce(");
    let code = LEN_RE.replace_all(&code, "length(");
    NOW_RE.replace_all(&code, "now()").into_owned()
}

fn quote_identifiers(code: &str, rules: &QuotingRules) -> String {
    IDENT_RE
        .replace_all(code, |found: &Captures<'_>| {
            let Some(token) = found.get(0) else {
                return String::new();
            };
            let word = token.as_str();
            if rules.mixed_case.contains(word) {
                return quote_ident(word);
            }
            let dotted = code[..token.start()].ends_with('.') || code[token.end()..].starts_with('.');
            if dotted && rules.reserved.contains(word) {
                return quote_ident(word);
            }
            word.to_string()
        })
        .into_owned()
}

/// Drops terminating `;` at code level, including ones followed only by
/// comments, so an appended `limit` stays inside the one statement.
fn strip_trailing_semicolons(sql: &str) -> String {
    let parts = segments(sql);
    let is_tail = |segment: &Segment<'_>| match segment.kind {
        SegmentKind::LineComment | SegmentKind::BlockComment => true,
        SegmentKind::Code => segment
            .text
            .chars()
            .all(|ch| ch == ';' || ch.is_whitespace()),
        _ => false,
    };
    let body_end = parts.iter().rposition(|segment| !is_tail(segment));

    let mut out = String::with_capacity(sql.len());
    for (index, segment) in parts.iter().enumerate() {
        let in_tail = body_end.is_none_or(|end| index > end);
        if segment.kind != SegmentKind::Code {
            out.push_str(segment.text);
        } else if in_tail {
            out.push_str(&segment.text.replace(';', ""));
        } else if Some(index) == body_end {
            let keep = segment
                .text
                .trim_end_matches(|ch: char| ch == ';' || ch.is_whitespace())
                .len();
            out.push_str(&segment.text[..keep]);
            out.push_str(&segment.text[keep..].replace(';', ""));
        } else {
            out.push_str(segment.text);
        }
    }
    out.truncate(out.trim_end().len());
    out
}

/// Select/with statements without a top-level `limit` or `fetch` get one.
fn needs_row_cap(sql: &str) -> bool {
    let code = code_only(sql);
    let leading = LEADING_WORD_RE
        .find(code.trim_start())
        .map(|word| word.as_str().to_ascii_lowercase());
    if !matches!(leading.as_deref(), Some("select" | "with")) {
        return false;
    }
    !has_top_level_row_cap(&code)
}

fn has_top_level_row_cap(code: &str) -> bool {
    let mut depth = 0i32;
    let mut word = String::new();
    let mut previous = String::new();
    for ch in code.chars().chain(std::iter::once(' ')) {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            word.push(ch);
            continue;
        }
        if depth == 0 {
            if word.eq_ignore_ascii_case("limit") {
                return true;
            }
            let fetch_clause = previous.eq_ignore_ascii_case("fetch")
                && (word.eq_ignore_ascii_case("first") || word.eq_ignore_ascii_case("next"));
            if fetch_clause {
                return true;
            }
        }
        if !word.is_empty() {
            previous = std::mem::take(&mut word);
        }
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosscheck_core::{ColumnInfo, QualityBreakdown, TableInfo, TableKind};

    fn model() -> SchemaModel {
        let column = |name: &str| ColumnInfo {
            name: name.to_string(),
            data_type: "text".to_string(),
            is_nullable: true,
            default: None,
            is_primary_key: false,
            is_foreign_key: false,
            distinct_estimate: None,
            null_fraction: None,
        };
        SchemaModel {
            model_version: "0.1".to_string(),
            engine: "postgres".to_string(),
            database: None,
            tables: vec![TableInfo {
                schema: "public".to_string(),
                name: "CustomerOrders".to_string(),
                table_type: TableKind::Table,
                column_count: 3,
                estimated_rows: 0,
                size_bytes: 0,
                has_primary_key: false,
                quality_score: 0.0,
                quality_breakdown: QualityBreakdown::default(),
                columns: vec![column("orderDate"), column("order"), column("status")],
            }],
            declared_relations: Vec::new(),
            implicit_relations: Vec::new(),
            ranked_relations: Vec::new(),
        }
    }

    #[test]
    fn quotes_mixed_case_and_dotted_reserved_names() {
        let sql = "select o.orderDate, o.order from public.CustomerOrders o order by 1";
        assert_eq!(
            optimize_sql(sql, &model(), 100),
            "select o.\"orderDate\", o.\"order\" from public.\"CustomerOrders\" o order by 1\nlimit 100"
        );
    }

    #[test]
    fn normalizes_functions_outside_literals() {
        let sql = "select isnull(a, 0), LEN(b), GETDATE(), sysdate, 'nvl(x)' from t limit 5;";
        assert_eq!(
            optimize_sql(sql, &model(), 100),
            "select coalesce(a, 0), length(b), now(), now(), 'nvl(x)' from t limit 5"
        );
    }

    #[test]
    fn caps_rows_only_at_top_level() {
        let capped = optimize_sql("select * from (select 1 limit 1) s;;", &model(), 50);
        assert!(capped.ends_with("s\nlimit 50"), "{capped}");
        assert_eq!(optimize_sql("show search_path", &model(), 50), "show search_path");
        assert_eq!(
            optimize_sql("explain select 1", &model(), 50),
            "explain select 1"
        );
    }

    #[test]
    fn semicolon_before_trailing_comment_is_dropped() {
        let sql = optimize_sql(
            "select count(*) as total_records from public.orders; -- all orders",
            &model(),
            1000,
        );
        assert_eq!(
            sql,
            "select count(*) as total_records from public.orders -- all orders\nlimit 1000"
        );
        assert!(!code_only(&sql).contains(';'));
    }

    #[test]
    fn fetch_first_counts_as_a_row_cap() {
        let sql = "select id from public.orders order by id fetch first 10 rows only";
        assert_eq!(optimize_sql(sql, &model(), 1000), sql);
        let nested = optimize_sql(
            "select * from (select id from t fetch next 5 rows only) s",
            &model(),
            1000,
        );
        assert!(nested.ends_with("s\nlimit 1000"), "{nested}");
    }

    #[test]
    fn trailing_comment_does_not_swallow_the_cap() {
        let sql = optimize_sql("select 1 -- done", &model(), 10);
        assert_eq!(sql, "select 1 -- done\nlimit 10");
    }
}
