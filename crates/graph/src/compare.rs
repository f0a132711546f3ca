use crate::types::KnowledgeGraph;
use serde::Serialize;
use std::collections::HashSet;

/// Size summary of a single graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub entities: usize,
    pub relationships: usize,
    pub attributes: usize,
}

impl GraphStats {
    pub fn of(graph: &KnowledgeGraph) -> Self {
        Self {
            entities: graph.entity_count(),
            relationships: graph.relationship_count(),
            attributes: graph.attribute_count(),
        }
    }
}

/// Per-dimension difference between two graphs (before minus after, may be negative)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsDelta {
    pub entities: i64,
    pub relationships: i64,
    pub attributes: i64,
}

/// Per-dimension reduction in percent; 0.0 when the "before" count is zero
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReductionRates {
    pub entities: f32,
    pub relationships: f32,
    pub attributes: f32,
}

/// Before/after report for a pruning run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphComparison {
    pub before: GraphStats,
    pub after: GraphStats,
    pub diff: StatsDelta,
    pub rates: ReductionRates,
    /// Entity ids present before and gone after, sorted
    pub removed_entity_ids: Vec<String>,
}

impl GraphComparison {
    pub fn between(before: &KnowledgeGraph, after: &KnowledgeGraph) -> Self {
        let stats_before = GraphStats::of(before);
        let stats_after = GraphStats::of(after);

        let diff = StatsDelta {
            entities: delta(stats_before.entities, stats_after.entities),
            relationships: delta(stats_before.relationships, stats_after.relationships),
            attributes: delta(stats_before.attributes, stats_after.attributes),
        };
        let rates = ReductionRates {
            entities: rate(diff.entities, stats_before.entities),
            relationships: rate(diff.relationships, stats_before.relationships),
            attributes: rate(diff.attributes, stats_before.attributes),
        };

        let kept: HashSet<&str> = after.entities().iter().map(|e| e.id.as_str()).collect();
        let mut removed_entity_ids: Vec<String> = before
            .entities()
            .iter()
            .filter(|e| !kept.contains(e.id.as_str()))
            .map(|e| e.id.clone())
            .collect();
        removed_entity_ids.sort();

        Self {
            before: stats_before,
            after: stats_after,
            diff,
            rates,
            removed_entity_ids,
        }
    }
}

fn delta(before: usize, after: usize) -> i64 {
    before as i64 - after as i64
}

fn rate(diff: i64, before: usize) -> f32 {
    if before == 0 {
        0.0
    } else {
        diff as f32 / before as f32 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Entity, Relationship};
    use pretty_assertions::assert_eq;

    #[test]
    fn compares_counts_and_removed_ids() {
        let before = KnowledgeGraph::from_parts(
            vec![
                Entity::new("A", "产品")
                    .with_attribute("k1", "v1")
                    .with_attribute("k2", "v2")
                    .with_attribute("k3", "v3"),
                Entity::new("B", "组件").with_attribute("k1", "v1"),
                Entity::new("D", "噪音"),
                Entity::new("C", "背景"),
            ],
            vec![
                Relationship::new("A", "B", "包含"),
                Relationship::new("A", "C", "展示于"),
                Relationship::new("C", "D", "关联"),
            ],
        )
        .unwrap();
        let after = KnowledgeGraph::from_parts(
            vec![
                Entity::new("A", "产品")
                    .with_attribute("k1", "v1")
                    .with_attribute("核心定位", "智能设备"),
                Entity::new("B", "组件").with_attribute("k1", "v1"),
            ],
            vec![Relationship::new("A", "B", "包含")],
        )
        .unwrap();

        let report = GraphComparison::between(&before, &after);
        assert_eq!(
            report.before,
            GraphStats {
                entities: 4,
                relationships: 3,
                attributes: 4
            }
        );
        assert_eq!(report.diff.entities, 2);
        assert_eq!(report.diff.attributes, 1);
        assert!((report.rates.entities - 50.0).abs() < 1e-4);
        assert!((report.rates.attributes - 25.0).abs() < 1e-4);
        assert_eq!(report.removed_entity_ids, vec!["C".to_string(), "D".to_string()]);
    }

    #[test]
    fn empty_before_has_zero_rates() {
        let report = GraphComparison::between(&KnowledgeGraph::new(), &KnowledgeGraph::new());
        assert_eq!(report.rates.entities, 0.0);
        assert_eq!(report.rates.relationships, 0.0);
        assert!(report.removed_entity_ids.is_empty());
    }
}
