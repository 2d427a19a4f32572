use std::collections::BTreeSet;

use crosscheck_core::RankedRelation;

/// Distinct relation kinds (2) plus distinct opportunities (4).
pub const MAX_DIVERSITY: usize = 6;

/// Number of distinct relation kinds and validation opportunities present.
pub fn relation_diversity(relations: &[RankedRelation]) -> usize {
    let kinds: BTreeSet<_> = relations.iter().map(|r| r.kind).collect();
    let opportunities: BTreeSet<_> = relations
        .iter()
        .flat_map(|r| r.opportunities.iter().copied())
        .collect();
    kinds.len() + opportunities.len()
}

/// `0.5 * related share + 0.3 * sample share + 0.2 * diversity share`,
/// each share saturating at 1.
pub fn complexity_score(
    related: usize,
    max_related: usize,
    rows: usize,
    max_rows: usize,
    diversity: usize,
) -> f64 {
    let share = |value: usize, max: usize| {
        if max == 0 {
            0.0
        } else {
            (value as f64 / max as f64).min(1.0)
        }
    };
    let score = 0.5 * share(related, max_related)
        + 0.3 * share(rows, max_rows)
        + 0.2 * share(diversity, MAX_DIVERSITY);
    score.clamp(0.0, 1.0)
}
