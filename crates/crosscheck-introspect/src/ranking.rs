use std::cmp::Ordering;

use crosscheck_core::{
    DeclaredRelation, ImplicitRelation, RankedRelation, RelationKind, ValidationOpportunity,
};

/// Importance given to every declared foreign key.
pub const DECLARED_IMPORTANCE: u8 = 10;

/// Confidence from which an implicit relation is treated as a real reference.
pub const STRONG_CONFIDENCE: f64 = 0.7;

/// Importance of an implicit relation: `round(confidence * 8) + 2`.
pub fn implicit_importance(confidence: f64) -> u8 {
    (confidence.clamp(0.0, 1.0) * 8.0).round() as u8 + 2
}

/// Merge declared and implicit relations into one ranked list.
pub fn rank_relations(
    declared: &[DeclaredRelation],
    implicit: &[ImplicitRelation],
) -> Vec<RankedRelation> {
    let mut ranked: Vec<RankedRelation> = declared
        .iter()
        .map(|relation| RankedRelation {
            kind: RelationKind::Declared,
            source_table: relation.source_qualified(),
            source_column: relation.source_column.clone(),
            target_table: relation.target_qualified(),
            target_column: relation.target_column.clone(),
            importance: DECLARED_IMPORTANCE,
            confidence: 1.0,
            opportunities: vec![
                ValidationOpportunity::ReferentialIntegrity,
                ValidationOpportunity::OrphanDetection,
                ValidationOpportunity::CardinalityCheck,
            ],
            evidence: None,
        })
        .collect();

    ranked.extend(implicit.iter().map(|relation| {
        let opportunities = if relation.confidence >= STRONG_CONFIDENCE {
            vec![
                ValidationOpportunity::ReferentialIntegrity,
                ValidationOpportunity::OrphanDetection,
            ]
        } else {
            vec![
                ValidationOpportunity::OrphanDetection,
                ValidationOpportunity::DataConsistency,
            ]
        };
        RankedRelation {
            kind: RelationKind::Implicit,
            source_table: relation.source_qualified(),
            source_column: relation.source_column.clone(),
            target_table: relation.target_qualified(),
            target_column: relation.target_column.clone(),
            importance: implicit_importance(relation.confidence),
            confidence: relation.confidence,
            opportunities,
            evidence: Some(relation.evidence.clone()),
        }
    }));

    ranked.sort_by(compare_ranked);
    ranked
}

fn compare_ranked(left: &RankedRelation, right: &RankedRelation) -> Ordering {
    right
        .importance
        .cmp(&left.importance)
        .then_with(|| left.kind.cmp(&right.kind))
        .then_with(|| right.confidence.total_cmp(&left.confidence))
        .then_with(|| left.source_table.cmp(&right.source_table))
        .then_with(|| left.source_column.cmp(&right.source_column))
        .then_with(|| left.target_table.cmp(&right.target_table))
        .then_with(|| left.target_column.cmp(&right.target_column))
}
