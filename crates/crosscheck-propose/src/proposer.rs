use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crosscheck_context::AnalysisContext;
use crosscheck_core::{Credential, GenerationError, TextGenerator, ValidationProposal};

use crate::parse::parse_proposals;
use crate::prompt::{PromptOptions, build_request};

/// Proposals for one context plus the model's free-text insights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossTableValidationResult {
    pub focus_table: String,
    pub proposals: Vec<ValidationProposal>,
    pub insights: Vec<String>,
    /// Items in the response that could not be used.
    pub dropped: usize,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct ProposerOptions {
    pub prompt: PromptOptions,
    pub request_timeout: Duration,
}

impl Default for ProposerOptions {
    fn default() -> Self {
        Self {
            prompt: PromptOptions::default(),
            request_timeout: Duration::from_secs(90),
        }
    }
}

/// Asks the generation service for cross-table validations.
pub struct ValidationProposer {
    generator: Arc<dyn TextGenerator>,
    options: ProposerOptions,
}

impl ValidationProposer {
    pub fn new(generator: Arc<dyn TextGenerator>, options: ProposerOptions) -> Self {
        Self { generator, options }
    }

    pub async fn propose(
        &self,
        context: &AnalysisContext,
        credential: Option<&Credential>,
        cancel: &CancellationToken,
    ) -> Result<CrossTableValidationResult, GenerationError> {
        let credential = credential
            .filter(|credential| !credential.is_blank())
            .ok_or(GenerationError::MissingCredential)?;

        let request = build_request(context, &self.options.prompt);
        let started = Instant::now();
        let text = tokio::select! {
            _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
            result = tokio::time::timeout(
                self.options.request_timeout,
                self.generator.generate_text(&request, credential),
            ) => match result {
                Ok(result) => result?,
                Err(_) => return Err(GenerationError::Timeout(self.options.request_timeout.as_secs())),
            },
        };

        let known_tables: Vec<String> = context.tables().map(|t| t.qualified_name()).collect();
        let parsed = parse_proposals(&text, &known_tables).ok_or_else(|| {
            GenerationError::MalformedResponse("no JSON object or array in response".to_string())
        })?;

        if parsed.dropped > 0 {
            warn!(
                event = "proposal_dropped",
                focus = %context.focus_table,
                dropped = parsed.dropped
            );
        }
        if parsed.proposals.is_empty() {
            return Err(GenerationError::NoUsableProposals {
                dropped: parsed.dropped,
            });
        }

        info!(
            event = "proposals_parsed",
            provider = self.generator.provider(),
            focus = %context.focus_table,
            accepted = parsed.proposals.len(),
            dropped = parsed.dropped,
            duration_ms = started.elapsed().as_millis() as u64
        );

        Ok(CrossTableValidationResult {
            focus_table: context.focus_table.clone(),
            proposals: parsed.proposals,
            insights: parsed.insights,
            dropped: parsed.dropped,
            model: request.model,
        })
    }
}
