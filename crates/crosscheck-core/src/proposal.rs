use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Category of a proposed data-quality check.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationType {
    ReferentialIntegrity,
    TemporalConsistency,
    StatusConsistency,
    Uniqueness,
    Format,
    Anomaly,
    BusinessRule,
}

impl ValidationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationType::ReferentialIntegrity => "referential-integrity",
            ValidationType::TemporalConsistency => "temporal-consistency",
            ValidationType::StatusConsistency => "status-consistency",
            ValidationType::Uniqueness => "uniqueness",
            ValidationType::Format => "format",
            ValidationType::Anomaly => "anomaly",
            ValidationType::BusinessRule => "business-rule",
        }
    }

    /// Lenient label parsing for model output (`"Referential Integrity"`,
    /// `"duplicates"`, `"business_rule"`, ...).
    pub fn parse_label(label: &str) -> Option<Self> {
        let normalized = label
            .trim()
            .to_ascii_lowercase()
            .replace(['_', ' '], "-");
        let value = match normalized.as_str() {
            "referential-integrity" | "referential" | "integrity" | "foreign-key"
            | "orphan" | "orphans" | "relationship" => ValidationType::ReferentialIntegrity,
            "temporal-consistency" | "temporal" | "date" | "chronological" | "timeline" => {
                ValidationType::TemporalConsistency
            }
            "status-consistency" | "status" | "state" | "state-consistency" => {
                ValidationType::StatusConsistency
            }
            "uniqueness" | "unique" | "duplicate" | "duplicates" | "duplicate-detection" => {
                ValidationType::Uniqueness
            }
            "format" | "pattern" | "format-validation" => ValidationType::Format,
            "anomaly" | "anomalies" | "outlier" | "statistical" => ValidationType::Anomaly,
            "business-rule" | "business" | "business-logic" | "cross-table" | "consistency" => {
                ValidationType::BusinessRule
            }
            _ => return None,
        };
        Some(value)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
}

impl Complexity {
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" | "simple" | "easy" => Some(Complexity::Low),
            "medium" | "moderate" => Some(Complexity::Medium),
            "high" | "complex" | "hard" => Some(Complexity::High),
            _ => None,
        }
    }
}

/// A relationship a proposal depends on.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct InvolvedRelationship {
    pub from_table: String,
    pub to_table: String,
    /// Free-form join condition such as `orders.customer_id = customers.id`.
    pub join_condition: String,
}

/// Natural-language data-quality check proposed by the generation service.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ValidationProposal {
    /// Stable identifier derived from the proposal content.
    pub id: String,
    pub sequence: u32,
    pub description: String,
    pub validation_type: ValidationType,
    /// Within `[1, 10]`.
    pub priority: u8,
    pub complexity: Complexity,
    pub involved_tables: Vec<String>,
    pub involved_relationships: Vec<InvolvedRelationship>,
    /// Within `[0, 1]`.
    pub relevance: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_loose_type_labels() {
        assert_eq!(
            ValidationType::parse_label("Referential Integrity"),
            Some(ValidationType::ReferentialIntegrity)
        );
        assert_eq!(
            ValidationType::parse_label("business_rule"),
            Some(ValidationType::BusinessRule)
        );
        assert_eq!(
            ValidationType::parse_label("duplicates"),
            Some(ValidationType::Uniqueness)
        );
        assert_eq!(ValidationType::parse_label("vibes"), None);
    }

    #[test]
    fn type_serializes_kebab_case() {
        let json = serde_json::to_string(&ValidationType::TemporalConsistency).expect("json");
        assert_eq!(json, "\"temporal-consistency\"");
    }
}
