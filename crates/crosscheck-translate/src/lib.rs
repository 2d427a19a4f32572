//! Translation service: turns validation proposals into read-only SQL via
//! templates, a generation-service fallback, or a generic count, and gates
//! every statement before it can reach the database.

pub mod generative;
pub mod lexer;
pub mod optimize;
pub mod resolve;
pub mod safety;
pub mod service;
pub mod templates;
pub mod translated;

pub use generative::{GenerativeOptions, SQL_SYSTEM_INSTRUCTION, build_sql_request, extract_sql};
pub use optimize::optimize_sql;
pub use resolve::{JoinSpec, ResolvedProposal, resolve_proposal};
pub use safety::{ALLOWED_LEADING_KEYWORDS, is_sql_safe, validate_sql_safety};
pub use service::{PLACEHOLDER_SQL, TranslationService, TranslatorOptions};
pub use templates::{TemplateKind, TemplateMatch, match_template};
pub use translated::{SafetyVerdict, TranslatedValidation, TranslationMethod};
