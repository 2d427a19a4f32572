//! Binds a proposal's table and relationship names to the schema model.

use crosscheck_core::{ColumnInfo, RankedRelation, SchemaModel, TableInfo, ValidationProposal};

/// A child → parent join between two model tables.
#[derive(Debug, Clone, Copy)]
pub struct JoinSpec<'a> {
    pub child: &'a TableInfo,
    pub child_column: &'a ColumnInfo,
    pub parent: &'a TableInfo,
    pub parent_column: &'a ColumnInfo,
}

#[derive(Debug, Clone)]
pub struct ResolvedProposal<'a> {
    /// Involved tables found in the model, in proposal order.
    pub tables: Vec<&'a TableInfo>,
    pub join: Option<JoinSpec<'a>>,
}

pub fn resolve_proposal<'a>(
    proposal: &ValidationProposal,
    model: &'a SchemaModel,
) -> ResolvedProposal<'a> {
    let mut tables: Vec<&TableInfo> = Vec::new();
    for name in &proposal.involved_tables {
        if let Some(table) = model.resolve_table(name.trim()) {
            if !tables.iter().any(|known| std::ptr::eq(*known, table)) {
                tables.push(table);
            }
        }
    }

    let join = proposal
        .involved_relationships
        .iter()
        .find_map(|relationship| {
            join_from_condition(&relationship.join_condition, model).or_else(|| {
                let from = model.resolve_table(&relationship.from_table)?;
                let to = model.resolve_table(&relationship.to_table)?;
                join_between(from, to, model)
            })
        })
        .or_else(|| {
            tables.iter().enumerate().find_map(|(index, left)| {
                tables[index + 1..]
                    .iter()
                    .find_map(|right| join_between(left, right, model))
            })
        });

    ResolvedProposal { tables, join }
}

/// Highest-ranked relation connecting two tables.
fn join_between<'a>(
    left: &TableInfo,
    right: &TableInfo,
    model: &'a SchemaModel,
) -> Option<JoinSpec<'a>> {
    model
        .relations_between(&left.qualified_name(), &right.qualified_name())
        .into_iter()
        .find_map(|relation| join_from_relation(relation, model))
}

fn join_from_relation<'a>(relation: &RankedRelation, model: &'a SchemaModel) -> Option<JoinSpec<'a>> {
    let child = model.table(&relation.source_table)?;
    let parent = model.table(&relation.target_table)?;
    Some(JoinSpec {
        child,
        child_column: child.column(&relation.source_column)?,
        parent,
        parent_column: parent.column(&relation.target_column)?,
    })
}

/// Parse `a.b = c.d` or `s.a.b = s.c.d`. Table parts that are aliases do
/// not resolve and yield `None`.
fn join_from_condition<'a>(condition: &str, model: &'a SchemaModel) -> Option<JoinSpec<'a>> {
    let (left, right) = condition.split_once('=')?;
    let (left_table, left_column) = column_ref(left, model)?;
    let (right_table, right_column) = column_ref(right, model)?;
    if std::ptr::eq(left_table, right_table) {
        return None;
    }

    let declared_reverse = model.ranked_relations.iter().any(|relation| {
        relation.source_table == right_table.qualified_name()
            && relation.source_column == right_column.name
            && relation.target_table == left_table.qualified_name()
            && relation.target_column == left_column.name
    });
    let left_is_key = left_column.is_primary_key && !right_column.is_primary_key;

    let spec = if declared_reverse || left_is_key {
        JoinSpec {
            child: right_table,
            child_column: right_column,
            parent: left_table,
            parent_column: left_column,
        }
    } else {
        JoinSpec {
            child: left_table,
            child_column: left_column,
            parent: right_table,
            parent_column: right_column,
        }
    };
    Some(spec)
}

fn column_ref<'a>(text: &str, model: &'a SchemaModel) -> Option<(&'a TableInfo, &'a ColumnInfo)> {
    let cleaned = text.trim().replace('"', "");
    let (table_part, column) = cleaned.rsplit_once('.')?;
    let table = model.resolve_table(table_part.trim())?;
    let column = table.column(column.trim())?;
    Some((table, column))
}

pub fn is_temporal(column: &ColumnInfo) -> bool {
    let data_type = column.data_type.to_ascii_lowercase();
    data_type == "date" || data_type.starts_with("timestamp")
}

const START_HINTS: &[&str] = &[
    "created", "start", "begin", "opened", "ordered", "placed", "issued", "registered",
    "signup", "joined", "booked", "requested",
];

const END_HINTS: &[&str] = &[
    "end", "closed", "shipped", "delivered", "completed", "paid", "resolved", "finished",
    "cancelled", "canceled", "due", "expire", "returned", "approved", "updated",
];

/// First temporal column whose name carries a start-of-life hint, else the
/// first temporal column.
pub fn creation_column(table: &TableInfo) -> Option<&ColumnInfo> {
    let temporal: Vec<&ColumnInfo> = table.columns.iter().filter(|c| is_temporal(c)).collect();
    temporal
        .iter()
        .find(|column| has_hint(&column.name, START_HINTS))
        .or_else(|| temporal.first())
        .copied()
}

/// A (start, end) pair of temporal columns within one table.
pub fn date_pair(table: &TableInfo) -> Option<(&ColumnInfo, &ColumnInfo)> {
    let temporal: Vec<&ColumnInfo> = table.columns.iter().filter(|c| is_temporal(c)).collect();
    let start = temporal
        .iter()
        .find(|column| has_hint(&column.name, START_HINTS))?;
    let end = temporal.iter().find(|column| {
        column.name != start.name && has_hint(&column.name, END_HINTS)
    })?;
    Some((*start, *end))
}

fn has_hint(name: &str, hints: &[&str]) -> bool {
    let lower = name.to_ascii_lowercase();
    hints.iter().any(|hint| lower.contains(hint))
}

pub fn status_column(table: &TableInfo) -> Option<&ColumnInfo> {
    table.columns.iter().find(|column| {
        let lower = column.name.to_ascii_lowercase();
        lower == "status" || lower == "state" || lower.ends_with("_status") || lower.ends_with("_state")
    })
}

const KEY_LIKE_NAMES: &[&str] = &["email", "username", "login", "code", "sku", "slug"];
const KEY_LIKE_SUFFIXES: &[&str] = &["_email", "_code", "_number", "_no", "_key", "_uuid"];

/// Column to check for duplicates: one named in the description, else a
/// natural-key-looking column. Primary keys are skipped.
pub fn uniqueness_column<'a>(table: &'a TableInfo, description: &str) -> Option<&'a ColumnInfo> {
    let text = description.to_ascii_lowercase();
    let words: Vec<&str> = text
        .split(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
        .filter(|word| !word.is_empty())
        .collect();
    let candidates = || table.columns.iter().filter(|column| !column.is_primary_key);

    let mentioned = candidates()
        .filter(|column| {
            let name = column.name.to_ascii_lowercase();
            name.len() >= 3
                && (words.contains(&name.as_str()) || text.contains(&name.replace('_', " ")))
        })
        .max_by_key(|column| column.name.len());
    mentioned.or_else(|| {
        candidates().find(|column| {
            let name = column.name.to_ascii_lowercase();
            KEY_LIKE_NAMES.contains(&name.as_str())
                || KEY_LIKE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
        })
    })
}
