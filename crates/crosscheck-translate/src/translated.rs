use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crosscheck_core::ValidationProposal;

/// How a proposal's SQL was produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TranslationMethod {
    Template,
    Generated,
    #[serde(alias = "fallback")]
    Generic,
}

impl TranslationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranslationMethod::Template => "template",
            TranslationMethod::Generated => "generated",
            TranslationMethod::Generic => "generic",
        }
    }
}

/// Outcome of the safety gate for one statement.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(tag = "verdict", rename_all = "kebab-case")]
pub enum SafetyVerdict {
    Accepted,
    Rejected { reason: String },
}

impl SafetyVerdict {
    pub fn rejected(reason: impl Into<String>) -> Self {
        SafetyVerdict::Rejected {
            reason: reason.into(),
        }
    }

    pub fn is_safe(&self) -> bool {
        matches!(self, SafetyVerdict::Accepted)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            SafetyVerdict::Accepted => None,
            SafetyVerdict::Rejected { reason } => Some(reason),
        }
    }
}

/// A proposal paired with its SQL and safety verdict. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatedValidation {
    pub proposal: ValidationProposal,
    pub sql: String,
    /// True only when the statement passed the gate and is a real check,
    /// not a placeholder.
    pub is_valid_sql: bool,
    pub method: TranslationMethod,
    /// Template name when `method` is `template`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    pub safety: SafetyVerdict,
    pub requires_manual_review: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub translated_at: DateTime<Utc>,
}

impl TranslatedValidation {
    /// Whether the execution engine may run this statement.
    pub fn is_executable(&self) -> bool {
        self.is_valid_sql && self.safety.is_safe()
    }
}
