use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::schema::{RankedRelation, RelationKind};

/// Node and edge counts of a relation graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
}

/// A table reached while walking outward from a focus table.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphHit {
    pub table: String,
    pub hops: u8,
    /// Relation used to reach `table`.
    pub via: RankedRelation,
}

#[derive(Debug, Clone)]
struct Edge {
    neighbor: String,
    relation: usize,
}

/// Undirected adjacency over ranked relations.
#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    relations: Vec<RankedRelation>,
    adjacency: BTreeMap<String, Vec<Edge>>,
}

impl RelationGraph {
    pub fn from_relations(relations: &[RankedRelation]) -> Self {
        let relations = relations.to_vec();
        let mut adjacency: BTreeMap<String, Vec<Edge>> = BTreeMap::new();

        for (index, relation) in relations.iter().enumerate() {
            if relation.source_table == relation.target_table {
                continue;
            }
            adjacency
                .entry(relation.source_table.clone())
                .or_default()
                .push(Edge {
                    neighbor: relation.target_table.clone(),
                    relation: index,
                });
            adjacency
                .entry(relation.target_table.clone())
                .or_default()
                .push(Edge {
                    neighbor: relation.source_table.clone(),
                    relation: index,
                });
        }

        for edges in adjacency.values_mut() {
            edges.sort_by(|left, right| {
                let l = &relations[left.relation];
                let r = &relations[right.relation];
                r.importance
                    .cmp(&l.importance)
                    .then_with(|| kind_rank(l.kind).cmp(&kind_rank(r.kind)))
                    .then_with(|| left.neighbor.cmp(&right.neighbor))
                    .then_with(|| left.relation.cmp(&right.relation))
            });
        }

        Self {
            relations,
            adjacency,
        }
    }

    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            nodes: self.adjacency.len(),
            edges: self.relations.len(),
        }
    }

    /// Distinct neighbors of `table`, strongest relation first.
    pub fn neighbors(&self, table: &str) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.adjacency
            .get(table)
            .map(|edges| {
                edges
                    .iter()
                    .filter(|edge| seen.insert(edge.neighbor.as_str()))
                    .map(|edge| edge.neighbor.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Breadth-first walk from `focus`, bounded by hop count and table count.
    ///
    /// Within one hop level, neighbors are visited in descending importance,
    /// declared before implicit, then by name, so the result is deterministic.
    pub fn walk(&self, focus: &str, max_hops: u8, max_tables: usize) -> Vec<GraphHit> {
        let mut hits = Vec::new();
        if max_tables == 0 || max_hops == 0 {
            return hits;
        }

        let mut visited = BTreeSet::new();
        visited.insert(focus.to_string());
        let mut frontier = vec![focus.to_string()];

        for hop in 1..=max_hops {
            let mut next = Vec::new();
            for table in &frontier {
                let Some(edges) = self.adjacency.get(table) else {
                    continue;
                };
                for edge in edges {
                    if !visited.insert(edge.neighbor.clone()) {
                        continue;
                    }
                    hits.push(GraphHit {
                        table: edge.neighbor.clone(),
                        hops: hop,
                        via: self.relations[edge.relation].clone(),
                    });
                    if hits.len() >= max_tables {
                        return hits;
                    }
                    next.push(edge.neighbor.clone());
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        hits
    }
}

fn kind_rank(kind: RelationKind) -> u8 {
    match kind {
        RelationKind::Declared => 0,
        RelationKind::Implicit => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ValidationOpportunity;

    fn relation(source: &str, target: &str, kind: RelationKind, importance: u8) -> RankedRelation {
        RankedRelation {
            kind,
            source_table: source.to_string(),
            source_column: "ref_id".to_string(),
            target_table: target.to_string(),
            target_column: "id".to_string(),
            importance,
            confidence: 1.0,
            opportunities: vec![ValidationOpportunity::ReferentialIntegrity],
            evidence: None,
        }
    }

    #[test]
    fn walk_orders_by_importance_then_hops() {
        let graph = RelationGraph::from_relations(&[
            relation("public.orders", "public.customers", RelationKind::Declared, 10),
            relation("public.orders", "public.promos", RelationKind::Implicit, 5),
            relation("public.customers", "public.regions", RelationKind::Declared, 10),
        ]);

        let hits = graph.walk("public.orders", 2, 8);
        let tables: Vec<(&str, u8)> = hits
            .iter()
            .map(|hit| (hit.table.as_str(), hit.hops))
            .collect();
        assert_eq!(
            tables,
            vec![
                ("public.customers", 1),
                ("public.promos", 1),
                ("public.regions", 2)
            ]
        );
    }

    #[test]
    fn walk_respects_limits() {
        let graph = RelationGraph::from_relations(&[
            relation("public.a", "public.b", RelationKind::Declared, 10),
            relation("public.b", "public.c", RelationKind::Declared, 10),
            relation("public.a", "public.d", RelationKind::Implicit, 4),
        ]);

        assert_eq!(graph.walk("public.a", 1, 8).len(), 2);
        assert_eq!(graph.walk("public.a", 2, 1).len(), 1);
        assert!(graph.walk("public.missing", 2, 8).is_empty());
        assert_eq!(graph.summary(), GraphSummary { nodes: 4, edges: 3 });
    }

    #[test]
    fn declared_wins_importance_tie() {
        let graph = RelationGraph::from_relations(&[
            relation("public.a", "public.implicit_side", RelationKind::Implicit, 10),
            relation("public.a", "public.declared_side", RelationKind::Declared, 10),
        ]);
        assert_eq!(
            graph.neighbors("public.a"),
            vec!["public.declared_side", "public.implicit_side"]
        );
    }
}
