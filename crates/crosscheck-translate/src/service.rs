use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crosscheck_core::{
    Credential, GenerationError, SchemaModel, TextGenerator, ValidationProposal, qualified_ident,
};

use crate::generative::{GenerativeOptions, build_sql_request, extract_sql};
use crate::optimize::optimize_sql;
use crate::resolve::{ResolvedProposal, resolve_proposal};
use crate::safety::validate_sql_safety;
use crate::templates::match_template;
use crate::translated::{TranslatedValidation, TranslationMethod};

pub const PLACEHOLDER_SQL: &str = "select 'no translation available' as placeholder";

#[derive(Debug, Clone)]
pub struct TranslatorOptions {
    /// Row cap appended to select/with statements without one.
    pub max_rows: u32,
    pub generation: GenerativeOptions,
    pub request_timeout: Duration,
}

impl Default for TranslatorOptions {
    fn default() -> Self {
        Self {
            max_rows: 1000,
            generation: GenerativeOptions::default(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

struct Candidate {
    sql: String,
    method: TranslationMethod,
    template: Option<String>,
    requires_manual_review: bool,
    placeholder: bool,
    note: Option<String>,
}

/// Turns proposals into gated, optimized SQL.
pub struct TranslationService {
    generator: Option<Arc<dyn TextGenerator>>,
    options: TranslatorOptions,
}

impl TranslationService {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, options: TranslatorOptions) -> Self {
        Self { generator, options }
    }

    pub fn options(&self) -> &TranslatorOptions {
        &self.options
    }

    /// Translate one proposal. Always returns a record; failures degrade to
    /// the generic count or a placeholder.
    pub async fn translate(
        &self,
        proposal: &ValidationProposal,
        model: &SchemaModel,
        credential: Option<&Credential>,
        cancel: &CancellationToken,
    ) -> TranslatedValidation {
        let resolved = resolve_proposal(proposal, model);

        if let Some(found) = match_template(proposal, &resolved) {
            let candidate = Candidate {
                sql: found.sql,
                method: TranslationMethod::Template,
                template: Some(found.kind.as_str().to_string()),
                requires_manual_review: false,
                placeholder: false,
                note: None,
            };
            return self.finish(proposal, model, candidate);
        }

        let mut note = None;
        if let (Some(generator), Some(credential)) = (
            self.generator.as_ref(),
            credential.filter(|credential| !credential.is_blank()),
        ) {
            match self
                .generate(generator.as_ref(), proposal, &resolved, model, credential, cancel)
                .await
            {
                Ok(sql) => {
                    let candidate = Candidate {
                        sql,
                        method: TranslationMethod::Generated,
                        template: None,
                        requires_manual_review: false,
                        placeholder: false,
                        note: None,
                    };
                    return self.finish(proposal, model, candidate);
                }
                Err(err) => {
                    warn!(
                        event = "sql_generation_failed",
                        proposal_id = %proposal.id,
                        error = %err,
                        "falling back to generic count"
                    );
                    note = Some(format!("SQL generation failed: {err}"));
                }
            }
        }

        let candidate = generic_candidate(&resolved, note);
        self.finish(proposal, model, candidate)
    }

    /// One record per proposal, in input order.
    pub async fn translate_all(
        &self,
        proposals: &[ValidationProposal],
        model: &SchemaModel,
        credential: Option<&Credential>,
        cancel: &CancellationToken,
    ) -> Vec<TranslatedValidation> {
        let mut translated = Vec::with_capacity(proposals.len());
        for proposal in proposals {
            translated.push(self.translate(proposal, model, credential, cancel).await);
        }

        let count = |method| translated.iter().filter(|t| t.method == method).count();
        info!(
            event = "translation_finished",
            total = translated.len(),
            template = count(TranslationMethod::Template),
            generated = count(TranslationMethod::Generated),
            generic = count(TranslationMethod::Generic),
            executable = translated.iter().filter(|t| t.is_executable()).count(),
            "translation finished"
        );
        translated
    }

    async fn generate(
        &self,
        generator: &dyn TextGenerator,
        proposal: &ValidationProposal,
        resolved: &ResolvedProposal<'_>,
        model: &SchemaModel,
        credential: &Credential,
        cancel: &CancellationToken,
    ) -> Result<String, GenerationError> {
        if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }
        let request = build_sql_request(proposal, resolved, model, &self.options.generation);
        let timeout = self.options.request_timeout;
        let text = tokio::select! {
            _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
            result = tokio::time::timeout(timeout, generator.generate_text(&request, credential)) => {
                match result {
                    Ok(result) => result?,
                    Err(_) => return Err(GenerationError::Timeout(timeout.as_secs())),
                }
            }
        };
        extract_sql(&text)
            .ok_or_else(|| GenerationError::MalformedResponse("no SQL in response".to_string()))
    }

    fn finish(
        &self,
        proposal: &ValidationProposal,
        model: &SchemaModel,
        candidate: Candidate,
    ) -> TranslatedValidation {
        let first = validate_sql_safety(&candidate.sql);
        let (sql, safety) = if first.is_safe() && !candidate.placeholder {
            let optimized = optimize_sql(&candidate.sql, model, self.options.max_rows);
            let verdict = validate_sql_safety(&optimized);
            (optimized, verdict)
        } else {
            (candidate.sql, first)
        };

        if let Some(reason) = safety.reason() {
            warn!(
                event = "translation_rejected",
                proposal_id = %proposal.id,
                method = candidate.method.as_str(),
                reason,
                "statement rejected by safety gate"
            );
        } else {
            debug!(
                event = "translation_accepted",
                proposal_id = %proposal.id,
                method = candidate.method.as_str(),
                template = candidate.template.as_deref().unwrap_or("-"),
            );
        }

        TranslatedValidation {
            proposal: proposal.clone(),
            is_valid_sql: safety.is_safe() && !candidate.placeholder,
            sql,
            method: candidate.method,
            template: candidate.template,
            safety,
            requires_manual_review: candidate.requires_manual_review,
            note: candidate.note,
            translated_at: Utc::now(),
        }
    }
}

/// Row count over the first involved table, or a placeholder when none of
/// the involved tables is in the model.
fn generic_candidate(resolved: &ResolvedProposal<'_>, note: Option<String>) -> Candidate {
    match resolved.tables.first() {
        Some(table) => Candidate {
            sql: format!(
                "-- manual review: generic row count\nselect count(*) as total_records from {}",
                qualified_ident(&table.schema, &table.name)
            ),
            method: TranslationMethod::Generic,
            template: None,
            requires_manual_review: true,
            placeholder: false,
            note: note.or_else(|| Some("no specific check could be derived".to_string())),
        },
        None => Candidate {
            sql: PLACEHOLDER_SQL.to_string(),
            method: TranslationMethod::Generic,
            template: None,
            requires_manual_review: true,
            placeholder: true,
            note: Some(match note {
                Some(note) => format!("no involved table exists in the schema; {note}"),
                None => "no involved table exists in the schema".to_string(),
            }),
        },
    }
}
