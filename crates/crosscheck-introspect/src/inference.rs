use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crosscheck_core::{ColumnInfo, DeclaredRelation, DetectionMethod, ImplicitRelation, TableInfo};
use tracing::warn;

use crate::options::InferenceOptions;
use crate::types::types_compatible;

/// Extension point for additional implicit-relation heuristics.
///
/// Output is clamped, deduplicated and capped together with the built-in
/// naming rules.
pub trait RelationDetector: Send + Sync {
    fn name(&self) -> &'static str;

    fn detect(&self, tables: &[TableInfo]) -> Vec<ImplicitRelation>;
}

/// Built-in rules: `NAMING_PATTERN`, `COLUMN_NAME_MATCH`, `SCHEMA_PREFIX`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NamingDetector;

const KEY_SUFFIXES: &[&str] = &["_id", "_code", "_key", "_uuid"];
const MIN_STEM_LEN: usize = 3;

impl RelationDetector for NamingDetector {
    fn name(&self) -> &'static str {
        "naming"
    }

    fn detect(&self, tables: &[TableInfo]) -> Vec<ImplicitRelation> {
        let mut by_schema: BTreeMap<&str, Vec<&TableInfo>> = BTreeMap::new();
        for table in tables {
            by_schema.entry(table.schema.as_str()).or_default().push(table);
        }

        let mut out = Vec::new();
        for group in by_schema.values() {
            let index = SchemaIndex::new(group);
            for source in group {
                for column in &source.columns {
                    match naming_pattern(&index, source, column) {
                        Some(found) => out.push(found),
                        None => out.extend(schema_prefix(&index, source, column)),
                    }
                }
            }
            out.extend(column_name_matches(group));
        }
        out
    }
}

/// Infer undeclared relations with the built-in rules only.
pub fn infer_implicit_relations(
    tables: &[TableInfo],
    declared: &[DeclaredRelation],
    opts: &InferenceOptions,
) -> Vec<ImplicitRelation> {
    infer_with_detectors(tables, declared, opts, &[])
}

/// Infer undeclared relations with the built-in rules plus `detectors`.
pub fn infer_with_detectors(
    tables: &[TableInfo],
    declared: &[DeclaredRelation],
    opts: &InferenceOptions,
    detectors: &[Arc<dyn RelationDetector>],
) -> Vec<ImplicitRelation> {
    let mut candidates = NamingDetector.detect(tables);
    for detector in detectors {
        candidates.extend(detector.detect(tables));
    }
    finalize(candidates, tables, declared, opts.candidate_limit())
}

/// Run inference on the blocking pool under `opts.timeout`.
///
/// A timeout or a panicking detector degrades to an empty list.
pub async fn infer_with_timeout(
    tables: Vec<TableInfo>,
    declared: Vec<DeclaredRelation>,
    opts: InferenceOptions,
    detectors: Vec<Arc<dyn RelationDetector>>,
) -> Vec<ImplicitRelation> {
    let limit = opts.timeout;
    let task = tokio::task::spawn_blocking(move || {
        infer_with_detectors(&tables, &declared, &opts, &detectors)
    });

    match tokio::time::timeout(limit, task).await {
        Ok(Ok(relations)) => relations,
        Ok(Err(err)) => {
            warn!(event = "inference_degraded", reason = "detector_failed", error = %err);
            Vec::new()
        }
        Err(_) => {
            warn!(
                event = "inference_degraded",
                reason = "timeout",
                timeout_ms = limit.as_millis() as u64
            );
            Vec::new()
        }
    }
}

fn finalize(
    candidates: Vec<ImplicitRelation>,
    tables: &[TableInfo],
    declared: &[DeclaredRelation],
    limit: usize,
) -> Vec<ImplicitRelation> {
    let catalog: BTreeMap<String, BTreeSet<&str>> = tables
        .iter()
        .map(|table| {
            let columns = table.columns.iter().map(|c| c.name.as_str()).collect();
            (table.qualified_name(), columns)
        })
        .collect();
    let known = |table: &str, column: &str| {
        catalog
            .get(table)
            .is_some_and(|columns| columns.contains(column))
    };

    let mut declared_pairs = BTreeSet::new();
    for relation in declared {
        let (source, target) = (relation.source_qualified(), relation.target_qualified());
        declared_pairs.insert((target.clone(), source.clone()));
        declared_pairs.insert((source, target));
    }

    let mut best: BTreeMap<(String, String, String, String), ImplicitRelation> = BTreeMap::new();
    for mut candidate in candidates {
        if !candidate.confidence.is_finite() {
            continue;
        }
        candidate.confidence = candidate.confidence.clamp(0.0, 1.0);

        let source = candidate.source_qualified();
        let target = candidate.target_qualified();
        if source == target || candidate.source_schema != candidate.target_schema {
            continue;
        }
        if !known(&source, &candidate.source_column) || !known(&target, &candidate.target_column) {
            warn!(
                event = "implicit_relation_dropped",
                reason = "unknown_column",
                from = %format!("{source}.{}", candidate.source_column),
                to = %format!("{target}.{}", candidate.target_column)
            );
            continue;
        }
        if declared_pairs.contains(&(source.clone(), target.clone())) {
            continue;
        }

        let key = (
            source,
            candidate.source_column.clone(),
            target,
            candidate.target_column.clone(),
        );
        match best.get(&key) {
            Some(existing) if existing.confidence >= candidate.confidence => {}
            _ => {
                best.insert(key, candidate);
            }
        }
    }

    let mut relations: Vec<ImplicitRelation> = best.into_values().collect();
    relations.sort_by(|left, right| {
        right
            .confidence
            .total_cmp(&left.confidence)
            .then_with(|| left.source_qualified().cmp(&right.source_qualified()))
            .then_with(|| left.source_column.cmp(&right.source_column))
            .then_with(|| left.target_qualified().cmp(&right.target_qualified()))
            .then_with(|| left.target_column.cmp(&right.target_column))
    });
    relations.truncate(limit);
    relations
}

struct SchemaIndex<'a> {
    tables: &'a [&'a TableInfo],
    by_name: HashMap<String, &'a TableInfo>,
    by_stripped: HashMap<String, Vec<&'a TableInfo>>,
}

impl<'a> SchemaIndex<'a> {
    fn new(tables: &'a [&'a TableInfo]) -> Self {
        let mut by_name = HashMap::new();
        let mut by_stripped: HashMap<String, Vec<&TableInfo>> = HashMap::new();
        for table in tables {
            by_name.insert(table.name.to_ascii_lowercase(), *table);
            if let Some(stripped) = strip_table_prefix(&table.name) {
                by_stripped.entry(stripped).or_default().push(*table);
            }
        }
        Self {
            tables,
            by_name,
            by_stripped,
        }
    }
}

fn naming_pattern(
    index: &SchemaIndex<'_>,
    source: &TableInfo,
    column: &ColumnInfo,
) -> Option<ImplicitRelation> {
    let name = column.name.to_ascii_lowercase();
    let stem = name.strip_suffix("_id")?;
    let segments: Vec<&str> = stem.split('_').filter(|s| !s.is_empty()).collect();

    // `billing_address_id` falls back to `address_id` at reduced confidence.
    for start in 0..segments.len() {
        let candidate = segments[start..].join("_");
        if candidate.len() < MIN_STEM_LEN {
            continue;
        }
        for (variant, exact) in name_variants(&candidate) {
            let Some(target) = index.by_name.get(&variant) else {
                continue;
            };
            if same_table(source, target) {
                continue;
            }
            let Some(key) = key_column(target) else {
                continue;
            };
            if !types_compatible(&column.data_type, &key.data_type) {
                continue;
            }

            let mut confidence: f64 = if exact { 0.85 } else { 0.8 };
            if start > 0 {
                confidence -= 0.15;
            }
            if key.is_primary_key {
                confidence += 0.1;
            }
            return Some(implicit(
                source,
                column,
                target,
                key,
                confidence.min(1.0),
                DetectionMethod::NamingPattern,
                format!(
                    "{}.{} follows the <table>_id convention for {}.{}",
                    source.qualified_name(),
                    column.name,
                    target.qualified_name(),
                    key.name
                ),
            ));
        }
    }
    None
}

fn schema_prefix(
    index: &SchemaIndex<'_>,
    source: &TableInfo,
    column: &ColumnInfo,
) -> Option<ImplicitRelation> {
    let name = column.name.to_ascii_lowercase();
    let stem = name.strip_suffix("_id")?;
    if stem.len() < MIN_STEM_LEN {
        return None;
    }

    let mut target = None;
    for (variant, _) in name_variants(stem) {
        if let Some([only]) = index.by_stripped.get(&variant).map(Vec::as_slice) {
            target = Some((*only, "matches prefixed table"));
            break;
        }
    }

    if target.is_none() {
        let matches: Vec<&TableInfo> = index
            .tables
            .iter()
            .copied()
            .filter(|table| !same_table(source, table))
            .filter(|table| {
                let lowered = table.name.to_ascii_lowercase();
                let stripped = strip_table_prefix(&table.name);
                (lowered.starts_with(stem) && lowered != stem)
                    || stripped.is_some_and(|s| s.starts_with(stem) && s != stem)
            })
            .collect();
        if let [only] = matches.as_slice() {
            target = Some((*only, "abbreviates"));
        }
    }

    let (target, how) = target?;
    if same_table(source, target) {
        return None;
    }
    let key = key_column(target)?;
    if !types_compatible(&column.data_type, &key.data_type) {
        return None;
    }
    Some(implicit(
        source,
        column,
        target,
        key,
        0.6,
        DetectionMethod::SchemaPrefix,
        format!("{}.{} {how} {}", source.name, column.name, target.qualified_name()),
    ))
}

fn column_name_matches(tables: &[&TableInfo]) -> Vec<ImplicitRelation> {
    let mut out = Vec::new();
    for source in tables {
        for column in &source.columns {
            let lowered = column.name.to_ascii_lowercase();
            if lowered == "id" {
                continue;
            }
            let key_like = KEY_SUFFIXES.iter().any(|suffix| lowered.ends_with(suffix));

            for target in tables {
                if same_table(source, target) {
                    continue;
                }
                let Some(other) = target
                    .columns
                    .iter()
                    .find(|c| c.name.eq_ignore_ascii_case(&column.name))
                else {
                    continue;
                };
                if !types_compatible(&column.data_type, &other.data_type) {
                    continue;
                }

                let target_is_key = target
                    .single_primary_key()
                    .is_some_and(|key| key.name == other.name);
                let source_is_key = source
                    .single_primary_key()
                    .is_some_and(|key| key.name == column.name);

                if target_is_key && !source_is_key {
                    out.push(implicit(
                        source,
                        column,
                        target,
                        other,
                        0.7,
                        DetectionMethod::ColumnNameMatch,
                        format!(
                            "{}.{} shares name and type with primary key {}.{}",
                            source.qualified_name(),
                            column.name,
                            target.qualified_name(),
                            other.name
                        ),
                    ));
                } else if key_like
                    && !column.is_primary_key
                    && !other.is_primary_key
                    && source.qualified_name() < target.qualified_name()
                {
                    out.push(implicit(
                        source,
                        column,
                        target,
                        other,
                        0.5,
                        DetectionMethod::ColumnNameMatch,
                        format!(
                            "key-like column {} appears in {} and {}",
                            column.name,
                            source.qualified_name(),
                            target.qualified_name()
                        ),
                    ));
                }
            }
        }
    }
    out
}

fn implicit(
    source: &TableInfo,
    column: &ColumnInfo,
    target: &TableInfo,
    key: &ColumnInfo,
    confidence: f64,
    detection_method: DetectionMethod,
    evidence: String,
) -> ImplicitRelation {
    ImplicitRelation {
        source_schema: source.schema.clone(),
        source_table: source.name.clone(),
        source_column: column.name.clone(),
        target_schema: target.schema.clone(),
        target_table: target.name.clone(),
        target_column: key.name.clone(),
        confidence,
        detection_method,
        evidence,
    }
}

fn same_table(left: &TableInfo, right: &TableInfo) -> bool {
    left.schema == right.schema && left.name == right.name
}

fn key_column(table: &TableInfo) -> Option<&ColumnInfo> {
    table
        .single_primary_key()
        .or_else(|| table.columns.iter().find(|c| c.name.eq_ignore_ascii_case("id")))
}

/// `tbl_customers` -> `customers`, `crm_accounts` -> `accounts`.
fn strip_table_prefix(name: &str) -> Option<String> {
    let lowered = name.to_ascii_lowercase();
    let (prefix, rest) = lowered.split_once('_')?;
    if prefix.is_empty() || prefix.len() > 4 || rest.len() < MIN_STEM_LEN {
        return None;
    }
    Some(rest.to_string())
}

/// The stem itself (exact) followed by plural and singular variants.
fn name_variants(stem: &str) -> Vec<(String, bool)> {
    let mut variants = vec![(stem.to_string(), true)];
    let mut push = |candidate: String| {
        if !candidate.is_empty() && !variants.iter().any(|(v, _)| *v == candidate) {
            variants.push((candidate, false));
        }
    };

    push(format!("{stem}s"));
    push(format!("{stem}es"));
    if let Some(base) = stem.strip_suffix('y') {
        push(format!("{base}ies"));
    }
    if let Some(base) = stem.strip_suffix("ies") {
        push(format!("{base}y"));
    }
    if let Some(base) = stem.strip_suffix("es") {
        push(base.to_string());
    }
    if let Some(base) = stem.strip_suffix('s') {
        push(base.to_string());
    }
    variants
}
