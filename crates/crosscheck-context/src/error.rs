use thiserror::Error;

/// Failures of context collection; all abort the run.
#[derive(Debug, Clone, Error)]
pub enum ContextError {
    #[error("focus table not found in schema: {0}")]
    FocusTableNotFound(String),
    #[error("focus table '{name}' is ambiguous; qualify it as one of: {}", candidates.join(", "))]
    AmbiguousFocusTable {
        name: String,
        candidates: Vec<String>,
    },
    #[error("context collection cancelled")]
    Cancelled,
}
