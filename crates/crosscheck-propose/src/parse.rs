use std::collections::BTreeSet;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crosscheck_core::{Complexity, InvolvedRelationship, ValidationProposal, ValidationType};

const DEFAULT_PRIORITY: u8 = 5;
const DEFAULT_RELEVANCE: f64 = 0.5;

/// Proposals accepted from one response plus what was discarded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedProposals {
    pub proposals: Vec<ValidationProposal>,
    pub insights: Vec<String>,
    /// Items missing a required field, or repeating an earlier proposal.
    pub dropped: usize,
}

/// Parse free-form model output into proposals.
///
/// `known_tables` holds qualified names; bare table names in the response
/// are qualified against it when the match is unique.
pub fn parse_proposals(text: &str, known_tables: &[String]) -> Option<ParsedProposals> {
    let payload = locate_json(text)?;

    let (items, insights) = match &payload {
        Value::Array(items) => (items.clone(), Vec::new()),
        Value::Object(map) => {
            let items = ["validations", "proposals", "checks", "items"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_array))
                .cloned()?;
            (items, read_insights(map.get("insights")))
        }
        _ => return None,
    };

    let mut parsed = ParsedProposals {
        insights,
        ..ParsedProposals::default()
    };
    let mut seen_ids = BTreeSet::new();
    for item in &items {
        match read_proposal(item, known_tables) {
            Some(mut proposal) if seen_ids.insert(proposal.id.clone()) => {
                proposal.sequence = parsed.proposals.len() as u32 + 1;
                parsed.proposals.push(proposal);
            }
            _ => parsed.dropped += 1,
        }
    }
    Some(parsed)
}

/// Strip code fences and locate the outermost JSON object or array.
pub fn locate_json(text: &str) -> Option<Value> {
    let cleaned = strip_fences(text);
    if let Ok(value) = serde_json::from_str::<Value>(cleaned.trim()) {
        return Some(value);
    }

    let mut spans: Vec<(usize, char)> = [('{', '}'), ('[', ']')]
        .into_iter()
        .filter_map(|(open, close)| cleaned.find(open).map(|start| (start, close)))
        .collect();
    spans.sort_unstable();

    for (start, close) in spans {
        let Some(end) = cleaned.rfind(close) else {
            continue;
        };
        if end <= start {
            continue;
        }
        if let Ok(value) = serde_json::from_str::<Value>(&cleaned[start..=end]) {
            return Some(value);
        }
    }
    None
}

fn strip_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn read_insights(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(text)) if !text.trim().is_empty() => vec![text.trim().to_string()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn field<'a>(item: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| item.get(*name)).filter(|v| !v.is_null())
}

fn read_proposal(item: &Value, known_tables: &[String]) -> Option<ValidationProposal> {
    let description = field(item, &["description", "validation", "rule", "check"])?
        .as_str()?
        .trim()
        .to_string();
    if description.is_empty() {
        return None;
    }

    let validation_type =
        ValidationType::parse_label(field(item, &["type", "validation_type", "category"])?.as_str()?)?;

    let involved_tables: Vec<String> = match field(item, &["involved_tables", "tables"])? {
        Value::Array(values) => values
            .iter()
            .filter_map(Value::as_str)
            .map(|name| qualify(name, known_tables))
            .filter(|name| !name.is_empty())
            .collect(),
        Value::String(text) => text
            .split(',')
            .map(|name| qualify(name, known_tables))
            .filter(|name| !name.is_empty())
            .collect(),
        _ => Vec::new(),
    };
    if involved_tables.is_empty() {
        return None;
    }

    let priority = field(item, &["priority"]).map_or(DEFAULT_PRIORITY, read_priority);
    let complexity = field(item, &["complexity"])
        .and_then(Value::as_str)
        .and_then(Complexity::parse_label)
        .unwrap_or_default();
    let relevance = field(item, &["relevance", "relevance_score", "confidence"])
        .and_then(read_number)
        .map_or(DEFAULT_RELEVANCE, |value| value.clamp(0.0, 1.0));
    let involved_relationships = field(item, &["involved_relationships", "relationships"])
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|rel| read_relationship(rel, known_tables))
                .collect()
        })
        .unwrap_or_default();

    Some(ValidationProposal {
        id: proposal_id(validation_type, &description, &involved_tables),
        sequence: 0,
        description,
        validation_type,
        priority,
        complexity,
        involved_tables,
        involved_relationships,
        relevance,
    })
}

fn read_relationship(value: &Value, known_tables: &[String]) -> Option<InvolvedRelationship> {
    let from_table = field(value, &["from_table", "from", "source"])?.as_str()?;
    let to_table = field(value, &["to_table", "to", "target"])?.as_str()?;
    let join_condition = field(value, &["join_condition", "join", "condition", "on"])
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string();
    Some(InvolvedRelationship {
        from_table: qualify(from_table, known_tables),
        to_table: qualify(to_table, known_tables),
        join_condition,
    })
}

fn read_number(value: &Value) -> Option<f64> {
    let number: f64 = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn read_priority(value: &Value) -> u8 {
    if let Some(label) = value.as_str() {
        match label.trim().to_ascii_lowercase().as_str() {
            "critical" => return 10,
            "high" => return 8,
            "medium" => return 5,
            "low" => return 3,
            _ => {}
        }
    }
    read_number(value).map_or(DEFAULT_PRIORITY, |number| number.round().clamp(1.0, 10.0) as u8)
}

/// Qualify a bare name when exactly one known table carries it.
fn qualify(name: &str, known_tables: &[String]) -> String {
    let name = name.trim().trim_matches('"');
    if name.contains('.') || name.is_empty() {
        return name.to_string();
    }
    let suffix = format!(".{name}");
    let matches: Vec<&String> = known_tables
        .iter()
        .filter(|known| known.ends_with(&suffix))
        .collect();
    match matches.as_slice() {
        [only] => (*only).clone(),
        _ => name.to_string(),
    }
}

/// `val_` + the first 12 hex chars of SHA-256 over type, description and
/// sorted tables.
pub fn proposal_id(validation_type: ValidationType, description: &str, tables: &[String]) -> String {
    let mut sorted: Vec<&str> = tables.iter().map(String::as_str).collect();
    sorted.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(validation_type.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(description.trim().to_lowercase().as_bytes());
    hasher.update(b"|");
    hasher.update(sorted.join(",").as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("val_{}", &digest[..12])
}
