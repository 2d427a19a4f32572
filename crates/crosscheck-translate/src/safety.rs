//! Safety gate applied to every candidate statement before execution.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::lexer::{code_only, comments_only};
use crate::translated::SafetyVerdict;

const MUTATION_KEYWORDS: &str =
    "insert|update|delete|truncate|drop|alter|create|grant|revoke|copy|merge";

/// Statements may only start with one of these.
pub const ALLOWED_LEADING_KEYWORDS: &[&str] = &["with", "select", "explain", "show"];

static MUTATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b({MUTATION_KEYWORDS})\b")).expect("valid mutation regex")
});

static CHAINED_MUTATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i);\s*({MUTATION_KEYWORDS})\b")).expect("valid chaining regex")
});

static UNION_SELECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bunion\s+(all\s+)?select\b").expect("valid union regex"));

static ALWAYS_TRUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bor\s+(true\b|(\d+)\s*=\s*(\d+)|'([^']*)'\s*=\s*'([^']*)')")
        .expect("valid tautology regex")
});

static EXEC_FUNCTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(xp_cmdshell|sp_execute\w*|pg_read_file|pg_read_binary_file|pg_ls_dir|pg_stat_file|lo_import|lo_export|lo_unlink|lo_from_bytea|dblink\w*|pg_sleep\w*|pg_terminate_backend|pg_cancel_backend|pg_reload_conf|pg_rotate_logfile|set_config|nextval|setval|pg_advisory\w*|load_file|query_to_xml)\s*\(",
    )
    .expect("valid exec function regex")
});

static INTO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\binto\b").expect("valid into regex"));

static FIRST_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_]+").expect("valid first word regex"));

/// Decide whether `sql` may be sent to the database.
pub fn validate_sql_safety(sql: &str) -> SafetyVerdict {
    if sql.trim().is_empty() {
        return SafetyVerdict::rejected("empty statement");
    }

    let code = code_only(sql);

    if let Some(found) = CHAINED_MUTATION_RE.captures(&code) {
        return SafetyVerdict::rejected(format!(
            "statement chaining before '{}'",
            found[1].to_ascii_lowercase()
        ));
    }
    if let Some(found) = MUTATION_RE.captures(&comments_only(sql)) {
        return SafetyVerdict::rejected(format!(
            "'{}' concealed in a comment",
            found[1].to_ascii_lowercase()
        ));
    }
    if UNION_SELECT_RE.is_match(&code) && has_tautology(sql) {
        return SafetyVerdict::rejected("always-true UNION injection");
    }
    if let Some(found) = EXEC_FUNCTION_RE.captures(&code) {
        return SafetyVerdict::rejected(format!(
            "forbidden function '{}'",
            found[1].to_ascii_lowercase()
        ));
    }
    if let Some(found) = MUTATION_RE.captures(sql) {
        return SafetyVerdict::rejected(format!(
            "mutation keyword '{}'",
            found[1].to_ascii_lowercase()
        ));
    }
    if INTO_RE.is_match(&code) {
        return SafetyVerdict::rejected("SELECT ... INTO is not read-only");
    }
    if code.trim_end().trim_end_matches(';').contains(';') {
        return SafetyVerdict::rejected("statement chaining");
    }

    let leading = FIRST_WORD_RE
        .find(code.trim_start())
        .map(|word| word.as_str().to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_LEADING_KEYWORDS.contains(&leading.as_str()) {
        return SafetyVerdict::rejected(format!(
            "statement must start with {}",
            ALLOWED_LEADING_KEYWORDS.join(", ")
        ));
    }

    SafetyVerdict::Accepted
}

pub fn is_sql_safe(sql: &str) -> bool {
    validate_sql_safety(sql).is_safe()
}

/// `or 1=1`, `or 'a'='a'`, `or true`; comparisons of unequal constants are
/// not tautologies.
fn has_tautology(sql: &str) -> bool {
    ALWAYS_TRUE_RE.captures_iter(sql).any(|found| {
        if found.get(1).is_some_and(|m| m.as_str().eq_ignore_ascii_case("true")) {
            return true;
        }
        match (found.get(2), found.get(3), found.get(4), found.get(5)) {
            (Some(left), Some(right), _, _) => left.as_str() == right.as_str(),
            (_, _, Some(left), Some(right)) => left.as_str() == right.as_str(),
            _ => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(sql: &str) -> String {
        validate_sql_safety(sql)
            .reason()
            .map(str::to_string)
            .unwrap_or_default()
    }

    #[test]
    fn rejects_whole_word_mutations() {
        for sql in [
            "drop table x",
            "update y set z=1",
            "insert into t values (1)",
            "DELETE FROM orders",
            "select 1 where exists (select 1) /* ok */ ; truncate t",
            "merge into t using s on true when matched then do nothing",
            "select * from t for update",
        ] {
            assert!(!is_sql_safe(sql), "{sql}");
        }
    }

    #[test]
    fn mutation_words_inside_identifiers_are_fine() {
        assert!(is_sql_safe("select created_at, updated_by, deleted from public.orders"));
        assert!(is_sql_safe("SELECT count(*) FROM \"dropship_orders\""));
    }

    #[test]
    fn accepts_read_only_statements() {
        for sql in [
            "select count(*) from public.orders",
            "  WITH d AS (select 1) select * from d",
            "explain select 1",
            "show search_path",
            "-- leading note\nselect 1",
            "/* header */ select 1;",
            "select a from t union all select b from u",
        ] {
            assert!(is_sql_safe(sql), "{sql}: {}", reason(sql));
        }
    }

    #[test]
    fn chaining_before_a_mutation_is_named() {
        let sql = "SELECT id FROM orders; DROP TABLE orders;";
        assert_eq!(reason(sql), "statement chaining before 'drop'");
    }

    #[test]
    fn stacked_selects_are_rejected() {
        assert_eq!(reason("select 1; select 2"), "statement chaining");
        assert!(is_sql_safe("select ';' as separator"));
    }

    #[test]
    fn comment_concealed_mutation_is_named() {
        assert_eq!(
            reason("select 1 /* drop table orders */"),
            "'drop' concealed in a comment"
        );
    }

    #[test]
    fn tautological_union_is_rejected() {
        let sql = "select name from users where id = 1 or 1=1 union select password from accounts";
        assert_eq!(reason(sql), "always-true UNION injection");
        assert!(is_sql_safe(
            "select name from users where id = 1 or 1=2 union select name from staff"
        ));
    }

    #[test]
    fn exec_functions_and_select_into_are_rejected() {
        assert_eq!(
            reason("select pg_read_file('/etc/passwd')"),
            "forbidden function 'pg_read_file'"
        );
        assert_eq!(reason("select pg_sleep(10)"), "forbidden function 'pg_sleep'");
        assert_eq!(reason("select * into backup from orders"), "SELECT ... INTO is not read-only");
    }

    #[test]
    fn leading_keyword_is_enforced() {
        assert!(reason("vacuum orders").starts_with("statement must start with"));
        assert!(reason("").contains("empty"));
        assert!(!is_sql_safe("(select 1)"));
    }
}
