//! Error-text sanitization so credentials never reach logs or reports.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

const MAX_ERROR_TEXT_CHARS: usize = 512;
const REDACTED: &str = "[REDACTED]";

static QUERY_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([?&]key=)[^&\s]+").expect("valid query key regex"));

static KEY_VALUE_SECRET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\b(api[_-]?key|x-goog-api-key|access[_-]?token|token|secret|password|authorization)\b\s*[:=]\s*["']?[^"',\s}]+"#,
    )
    .expect("valid key/value secret regex")
});

static GOOGLE_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"AIza[0-9A-Za-z_\-]{20,}").expect("valid google key regex"));

/// Redact secrets from service error text and truncate it.
///
/// `credential` is removed verbatim in addition to pattern-based redaction.
pub fn sanitize_error_text(raw: &str, credential: Option<&str>) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "<empty error response body>".to_string();
    }

    let text = match serde_json::from_str::<Value>(trimmed) {
        Ok(mut json) => {
            redact_json_value(&mut json);
            serde_json::to_string(&json).unwrap_or_else(|_| "<unserializable error>".to_string())
        }
        Err(_) => redact_inline(trimmed),
    };

    let text = match credential.map(str::trim).filter(|key| key.len() >= 4) {
        Some(key) => text.replace(key, REDACTED),
        None => text,
    };
    truncate(text)
}

fn redact_json_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if is_sensitive_key(key) {
                    *val = Value::String(REDACTED.to_string());
                } else {
                    redact_json_value(val);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_json_value),
        Value::String(text) => *text = redact_inline(text),
        _ => {}
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.to_ascii_lowercase().replace(['-', ' '], "_");
    ["api_key", "token", "secret", "password", "authorization"]
        .iter()
        .any(|needle| normalized.contains(needle))
}

fn redact_inline(input: &str) -> String {
    let text = QUERY_KEY_RE.replace_all(input, "${1}[REDACTED]");
    let text = KEY_VALUE_SECRET_RE.replace_all(&text, "$1=[REDACTED]");
    GOOGLE_KEY_RE.replace_all(&text, REDACTED).into_owned()
}

fn truncate(input: String) -> String {
    let count = input.chars().count();
    if count <= MAX_ERROR_TEXT_CHARS {
        return input;
    }
    let head: String = input.chars().take(MAX_ERROR_TEXT_CHARS).collect();
    format!("{head}... [truncated {} chars]", count - MAX_ERROR_TEXT_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_keys_in_urls_and_json() {
        let raw = "error sending request for url (https://host/v1beta/models/m:generateContent?key=AIzaSyA1234567890abcdefghijkl)";
        let clean = sanitize_error_text(raw, None);
        assert!(!clean.contains("AIzaSy"));
        assert!(clean.contains("key=[REDACTED]"));

        let json = r#"{"error":{"message":"API key not valid","details":[{"api_key":"abc"}]}}"#;
        let clean = sanitize_error_text(json, None);
        assert!(!clean.contains("\"abc\""));
        assert!(clean.contains("API key not valid"));
    }

    #[test]
    fn removes_the_supplied_credential_verbatim() {
        let clean = sanitize_error_text("echo: my-custom-secret-value", Some("my-custom-secret-value"));
        assert_eq!(clean, "echo: [REDACTED]");
    }

    #[test]
    fn truncates_long_bodies() {
        let clean = sanitize_error_text(&"x".repeat(2_000), None);
        assert!(clean.contains("[truncated 1488 chars]"));
    }
}
