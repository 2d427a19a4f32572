#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use crosscheck_core::{
    Complexity, QueryError, ResultRow, RowSource, ScalarValue, ValidationProposal, ValidationType,
};
use crosscheck_translate::{SafetyVerdict, TranslatedValidation, TranslationMethod, validate_sql_safety};

/// Answers by looking for markers in the statement text.
#[derive(Default)]
pub struct ScriptedRows {
    pub in_flight: AtomicUsize,
    pub peak: AtomicUsize,
    pub calls: AtomicUsize,
    pub delay: Duration,
}

impl ScriptedRows {
    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::default()
        })
    }
}

#[async_trait]
impl RowSource for ScriptedRows {
    fn engine(&self) -> &'static str {
        "scripted"
    }

    async fn fetch_rows(&self, sql: &str, timeout: Duration) -> Result<Vec<ResultRow>, QueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if sql.contains("boom") {
            return Err(QueryError::Database("relation \"boom\" does not exist".to_string()));
        }
        if sql.contains("explode") {
            panic!("driver exploded");
        }
        if sql.contains("hang") {
            tokio::time::sleep(timeout).await;
            return Err(QueryError::Timeout(timeout));
        }
        if sql.contains("empty") {
            return Ok(Vec::new());
        }
        let invalid = if sql.contains("dirty") { 60 } else if sql.contains("some") { 5 } else { 0 };
        Ok(vec![
            ResultRow::new()
                .with("total_records", ScalarValue::Int(100))
                .with("invalid_records", ScalarValue::Int(invalid)),
        ])
    }
}

pub fn proposal(sequence: u32, validation_type: ValidationType, priority: u8) -> ValidationProposal {
    ValidationProposal {
        id: format!("val_{sequence:03}"),
        sequence,
        description: format!("check number {sequence}"),
        validation_type,
        priority,
        complexity: Complexity::Low,
        involved_tables: vec!["public.orders".to_string()],
        involved_relationships: Vec::new(),
        relevance: 0.5,
    }
}

/// A translated record whose validity comes from the real gate.
pub fn translated(proposal: ValidationProposal, sql: &str) -> TranslatedValidation {
    let safety = validate_sql_safety(sql);
    TranslatedValidation {
        proposal,
        sql: sql.to_string(),
        is_valid_sql: safety.is_safe(),
        method: TranslationMethod::Template,
        template: None,
        safety,
        requires_manual_review: false,
        note: None,
        translated_at: Utc::now(),
    }
}

pub fn placeholder(proposal: ValidationProposal) -> TranslatedValidation {
    TranslatedValidation {
        proposal,
        sql: "select 'no translation available' as placeholder".to_string(),
        is_valid_sql: false,
        method: TranslationMethod::Generic,
        template: None,
        safety: SafetyVerdict::Accepted,
        requires_manual_review: true,
        note: Some("no involved table exists in the schema".to_string()),
        translated_at: Utc::now(),
    }
}
