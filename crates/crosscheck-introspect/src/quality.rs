use crosscheck_core::{ColumnInfo, QualityBreakdown, TableInfo};

use crate::types::{TypeFamily, type_family};

pub const WEIGHT_PRIMARY_KEY: f64 = 25.0;
pub const WEIGHT_NON_NULL: f64 = 20.0;
pub const WEIGHT_STATISTICS: f64 = 15.0;
pub const WEIGHT_FOREIGN_KEYS: f64 = 15.0;
pub const WEIGHT_TYPES: f64 = 25.0;

/// Foreign-key count at which the sub-score saturates.
const FOREIGN_KEY_SATURATION: usize = 3;

/// Score a table's structural quality on a 0-100 scale.
///
/// Each sub-score is a percentage; `total` is their weighted composite.
pub fn score_table(table: &TableInfo) -> QualityBreakdown {
    let columns = &table.columns;

    let primary_key = if table.has_primary_key { 100.0 } else { 0.0 };
    let non_null = percentage(columns, |c| !c.is_nullable);
    let statistics = percentage(columns, ColumnInfo::has_statistics);
    let foreign_key_count = columns.iter().filter(|c| c.is_foreign_key).count();
    let foreign_keys =
        foreign_key_count.min(FOREIGN_KEY_SATURATION) as f64 / FOREIGN_KEY_SATURATION as f64 * 100.0;
    let type_appropriateness = percentage(columns, type_fits_role);

    let total = (primary_key * WEIGHT_PRIMARY_KEY
        + non_null * WEIGHT_NON_NULL
        + statistics * WEIGHT_STATISTICS
        + foreign_keys * WEIGHT_FOREIGN_KEYS
        + type_appropriateness * WEIGHT_TYPES)
        / 100.0;

    QualityBreakdown {
        primary_key,
        non_null: round1(non_null),
        statistics: round1(statistics),
        foreign_keys: round1(foreign_keys),
        type_appropriateness: round1(type_appropriateness),
        total: round1(total.clamp(0.0, 100.0)),
    }
}

/// Attach quality scores to every table in place.
pub fn score_tables(tables: &mut [TableInfo]) {
    for table in tables {
        table.quality_breakdown = score_table(table);
        table.quality_score = table.quality_breakdown.total;
    }
}

fn percentage(columns: &[ColumnInfo], predicate: impl Fn(&ColumnInfo) -> bool) -> f64 {
    if columns.is_empty() {
        return 0.0;
    }
    let hits = columns.iter().filter(|c| predicate(c)).count();
    hits as f64 / columns.len() as f64 * 100.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Identifier,
    Temporal,
    Flag,
    Quantity,
    Label,
}

fn role_of(name: &str) -> Option<Role> {
    let name = name.to_ascii_lowercase();
    if name == "id" || name.ends_with("_id") || name.ends_with("uuid") {
        return Some(Role::Identifier);
    }
    if name.ends_with("_at")
        || name.ends_with("_date")
        || name.ends_with("_on")
        || name.ends_with("_time")
        || name.starts_with("date")
        || name == "timestamp"
    {
        return Some(Role::Temporal);
    }
    if name.starts_with("is_") || name.starts_with("has_") || name.ends_with("_flag") {
        return Some(Role::Flag);
    }
    const QUANTITY: &[&str] = &["amount", "price", "total", "cost", "qty", "quantity", "balance"];
    if name.ends_with("_count") || QUANTITY.iter().any(|q| name.contains(q)) {
        return Some(Role::Quantity);
    }
    const LABEL: &[&str] = &["name", "title", "email", "description", "label"];
    if LABEL.iter().any(|l| name == *l || name.ends_with(&format!("_{l}"))) {
        return Some(Role::Label);
    }
    None
}

/// Columns without a recognizable role count as appropriate.
fn type_fits_role(column: &ColumnInfo) -> bool {
    use TypeFamily::*;
    let family = type_family(&column.data_type);
    match role_of(&column.name) {
        None => true,
        Some(Role::Identifier) => matches!(family, Integer | Uuid | Text | Decimal),
        Some(Role::Temporal) => matches!(family, Date | Timestamp | Time),
        Some(Role::Flag) => matches!(family, Boolean),
        Some(Role::Quantity) => matches!(family, Integer | Decimal | Float),
        Some(Role::Label) => matches!(family, Text),
    }
}
