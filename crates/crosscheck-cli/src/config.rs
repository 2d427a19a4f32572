//! `crosscheck.toml`: tuning knobs for every stage. Credentials never live
//! here; they are passed per run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crosscheck_context::CollectorOptions;
use crosscheck_eval::ExecutionOptions;
use crosscheck_introspect::{DiscoveryOptions, InferenceOptions};
use crosscheck_llm::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiConfig};
use crosscheck_propose::{PromptOptions, ProposerOptions};
use crosscheck_translate::{GenerativeOptions, TranslatorOptions};

use crate::pipeline::PipelineOptions;

pub const DEFAULT_CONFIG_FILE: &str = "crosscheck.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub discovery: DiscoverySection,
    pub context: ContextSection,
    pub generation: GenerationSection,
    pub translation: TranslationSection,
    pub execution: ExecutionSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiscoverySection {
    pub include_system_schemas: bool,
    pub include_views: bool,
    pub schemas: Option<Vec<String>>,
    pub query_timeout_secs: u64,
    pub max_candidates: usize,
    pub inference_timeout_secs: u64,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        let defaults = DiscoveryOptions::default();
        Self {
            include_system_schemas: defaults.include_system_schemas,
            include_views: defaults.include_views,
            schemas: defaults.schemas,
            query_timeout_secs: defaults.query_timeout.as_secs(),
            max_candidates: defaults.inference.max_candidates,
            inference_timeout_secs: defaults.inference.timeout.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContextSection {
    pub max_hops: u8,
    pub max_related_tables: usize,
    pub rows_per_table: usize,
    pub max_total_rows: usize,
    pub sample_timeout_secs: u64,
    pub large_table_rows: i64,
}

impl Default for ContextSection {
    fn default() -> Self {
        let defaults = CollectorOptions::default();
        Self {
            max_hops: defaults.max_hops,
            max_related_tables: defaults.max_related_tables,
            rows_per_table: defaults.rows_per_table,
            max_total_rows: defaults.max_total_rows,
            sample_timeout_secs: defaults.sample_timeout.as_secs(),
            large_table_rows: defaults.large_table_rows,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationSection {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_columns_per_table: usize,
    pub sample_rows_per_table: usize,
    pub request_timeout_secs: u64,
}

impl Default for GenerationSection {
    fn default() -> Self {
        let prompt = PromptOptions::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: prompt.temperature,
            max_columns_per_table: prompt.max_columns_per_table,
            sample_rows_per_table: prompt.sample_rows_per_table,
            request_timeout_secs: ProposerOptions::default().request_timeout.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranslationSection {
    pub max_rows: u32,
    /// Model for SQL generation; the `[generation]` model when unset.
    pub model: Option<String>,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub request_timeout_secs: u64,
}

impl Default for TranslationSection {
    fn default() -> Self {
        let defaults = TranslatorOptions::default();
        Self {
            max_rows: defaults.max_rows,
            model: None,
            temperature: defaults.generation.temperature,
            max_output_tokens: defaults.generation.max_output_tokens,
            request_timeout_secs: defaults.request_timeout.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutionSection {
    pub max_concurrency: usize,
    pub statement_timeout_secs: u64,
}

impl Default for ExecutionSection {
    fn default() -> Self {
        let defaults = ExecutionOptions::default();
        Self {
            max_concurrency: defaults.max_concurrency,
            statement_timeout_secs: defaults.statement_timeout.as_secs(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`, or `crosscheck.toml` in the working directory when no
    /// path is given. Only the implicit file may be absent.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !explicit && !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_toml(&content, &path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.execution.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "execution.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.execution.statement_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "execution.statement_timeout_secs must be positive".to_string(),
            ));
        }
        if self.translation.max_rows == 0 {
            return Err(ConfigError::Invalid(
                "translation.max_rows must be positive".to_string(),
            ));
        }
        for (name, value) in [
            ("generation.temperature", self.generation.temperature),
            ("translation.temperature", self.translation.temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be between 0 and 2, got {value}"
                )));
            }
        }
        if self.generation.model.trim().is_empty() {
            return Err(ConfigError::Invalid("generation.model is empty".to_string()));
        }
        Ok(())
    }

    pub fn gemini_config(&self) -> GeminiConfig {
        GeminiConfig {
            base_url: self.generation.base_url.clone(),
            request_timeout: Duration::from_secs(self.generation.request_timeout_secs),
        }
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        let discovery = DiscoveryOptions {
            include_system_schemas: self.discovery.include_system_schemas,
            include_views: self.discovery.include_views,
            schemas: self.discovery.schemas.clone().filter(|s| !s.is_empty()),
            query_timeout: Duration::from_secs(self.discovery.query_timeout_secs),
            inference: InferenceOptions {
                max_candidates: self.discovery.max_candidates,
                timeout: Duration::from_secs(self.discovery.inference_timeout_secs),
            },
            detectors: Vec::new(),
        };

        let context = CollectorOptions {
            max_hops: self.context.max_hops,
            max_related_tables: self.context.max_related_tables,
            rows_per_table: self.context.rows_per_table,
            max_total_rows: self.context.max_total_rows,
            sample_timeout: Duration::from_secs(self.context.sample_timeout_secs),
            large_table_rows: self.context.large_table_rows,
        };

        let proposer = ProposerOptions {
            prompt: PromptOptions {
                model: self.generation.model.clone(),
                temperature: self.generation.temperature,
                max_columns_per_table: self.generation.max_columns_per_table,
                sample_rows_per_table: self.generation.sample_rows_per_table,
                ..PromptOptions::default()
            },
            request_timeout: Duration::from_secs(self.generation.request_timeout_secs),
        };

        let translation = TranslatorOptions {
            max_rows: self.translation.max_rows,
            generation: GenerativeOptions {
                model: self
                    .translation
                    .model
                    .clone()
                    .unwrap_or_else(|| self.generation.model.clone()),
                temperature: self.translation.temperature,
                max_output_tokens: self.translation.max_output_tokens,
            },
            request_timeout: Duration::from_secs(self.translation.request_timeout_secs),
        };

        let execution = ExecutionOptions {
            max_concurrency: self.execution.max_concurrency,
            statement_timeout: Duration::from_secs(self.execution.statement_timeout_secs),
        };

        PipelineOptions {
            discovery,
            context,
            proposer,
            translation,
            execution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = PipelineConfig::from_toml(
            "[execution]\nmax_concurrency = 2\n",
            Path::new("crosscheck.toml"),
        )
        .expect("parse config");

        assert_eq!(config.execution.max_concurrency, 2);
        assert_eq!(config.execution.statement_timeout_secs, 60);
        assert_eq!(config.context, ContextSection::default());

        let options = config.pipeline_options();
        assert_eq!(options.execution.max_concurrency, 2);
        assert_eq!(options.translation.max_rows, 1000);
        assert_eq!(options.translation.generation.model, DEFAULT_MODEL);
    }

    #[test]
    fn translation_model_overrides_generation_model() {
        let config = PipelineConfig::from_toml(
            "[generation]\nmodel = \"gemini-1.5-pro\"\n[translation]\nmodel = \"gemini-1.5-flash-8b\"\n",
            Path::new("crosscheck.toml"),
        )
        .expect("parse config");

        let options = config.pipeline_options();
        assert_eq!(options.proposer.prompt.model, "gemini-1.5-pro");
        assert_eq!(options.translation.generation.model, "gemini-1.5-flash-8b");
    }

    #[test]
    fn rejects_zero_concurrency_and_unknown_types() {
        let err = PipelineConfig::from_toml(
            "[execution]\nmax_concurrency = 0\n",
            Path::new("crosscheck.toml"),
        )
        .expect_err("zero concurrency");
        assert!(err.to_string().contains("max_concurrency"));

        let err = PipelineConfig::from_toml(
            "[execution]\nmax_concurrency = \"five\"\n",
            Path::new("crosscheck.toml"),
        )
        .expect_err("wrong type");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = PipelineConfig::load_or_default(Some(Path::new("/nonexistent/crosscheck.toml")))
            .expect_err("missing explicit file");
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
