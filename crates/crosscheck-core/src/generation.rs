use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::GenerationError;

/// Generation-service credential, supplied per call by the caller.
#[derive(Clone)]
pub struct Credential {
    api_key: String,
}

impl Credential {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn is_blank(&self) -> bool {
        self.api_key.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// One text-generation request.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub model: String,
    pub system_instruction: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// Request/response text generation, shared by the proposer and the SQL
/// fallback translator.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the provider identifier (e.g. `gemini`).
    fn provider(&self) -> &'static str;

    async fn generate_text(
        &self,
        request: &GenerationRequest,
        credential: &Credential,
    ) -> Result<String, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_key() {
        let credential = Credential::new("sk-very-secret");
        assert_eq!(format!("{credential:?}"), "Credential(***)");
        assert!(!Credential::new("  ").api_key().is_empty());
        assert!(Credential::new("  ").is_blank());
    }
}
