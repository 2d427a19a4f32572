//! Validation proposer: renders an analysis context into a generation
//! request and parses the reply into validation proposals.

pub mod parse;
pub mod prompt;
pub mod proposer;

pub use parse::{ParsedProposals, locate_json, parse_proposals, proposal_id};
pub use prompt::{PromptOptions, build_request, render_prompt, requested_count, token_budget};
pub use proposer::{CrossTableValidationResult, ProposerOptions, ValidationProposer};
