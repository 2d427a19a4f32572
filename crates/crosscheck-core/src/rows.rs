use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single result cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ScalarValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    /// Numeric view of the cell; numeric text is accepted since some drivers
    /// hand back `numeric` aggregates as strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Int(value) => Some(*value as f64),
            ScalarValue::Float(value) if value.is_finite() => Some(*value),
            ScalarValue::Text(text) => text.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ScalarValue::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ScalarValue::Int(_) | ScalarValue::Float(_))
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => f.write_str("NULL"),
            ScalarValue::Bool(value) => write!(f, "{value}"),
            ScalarValue::Int(value) => write!(f, "{value}"),
            ScalarValue::Float(value) => write!(f, "{value}"),
            ScalarValue::Text(value) => f.write_str(value),
        }
    }
}

/// One result row as an ordered map from column name to value.
///
/// Column order follows the statement's select list and is preserved through
/// serialization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow {
    cells: Vec<(String, ScalarValue)>,
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: Vec::with_capacity(capacity),
        }
    }

    /// Append a cell. A repeated column name replaces the earlier value.
    pub fn push(&mut self, column: impl Into<String>, value: ScalarValue) {
        let column = column.into();
        if let Some(existing) = self.cells.iter_mut().find(|(name, _)| *name == column) {
            existing.1 = value;
        } else {
            self.cells.push((column, value));
        }
    }

    /// Builder-style `push`.
    pub fn with(mut self, column: impl Into<String>, value: ScalarValue) -> Self {
        self.push(column, value);
        self
    }

    /// Look up a cell, exact name first, then case-insensitively.
    pub fn get(&self, column: &str) -> Option<&ScalarValue> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .or_else(|| {
                self.cells
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(column))
            })
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScalarValue)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl FromIterator<(String, ScalarValue)> for ResultRow {
    fn from_iter<T: IntoIterator<Item = (String, ScalarValue)>>(iter: T) -> Self {
        let mut row = ResultRow::new();
        for (column, value) in iter {
            row.push(column, value);
        }
        row
    }
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (column, value) in &self.cells {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ResultRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = ResultRow;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of column names to scalar values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ResultRow, A::Error> {
                let mut row = ResultRow::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((column, value)) = map.next_entry::<String, ScalarValue>()? {
                    row.push(column, value);
                }
                Ok(row)
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

impl JsonSchema for ResultRow {
    fn schema_name() -> String {
        "ResultRow".to_string()
    }

    fn json_schema(generator: &mut schemars::r#gen::SchemaGenerator) -> schemars::schema::Schema {
        <BTreeMap<String, ScalarValue>>::json_schema(generator)
    }
}

/// Column names of a result set, taken from its first row.
pub fn column_names(rows: &[ResultRow]) -> Vec<String> {
    rows.first()
        .map(|row| row.columns().map(str::to_string).collect())
        .unwrap_or_default()
}
