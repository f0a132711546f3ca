use crate::config::TopologyConfig;
use kgmatch_graph::KnowledgeGraph;

/// Structural pruning: isolated nodes and weakly connected blacklisted nodes.
pub struct TopologyPruner {
    config: TopologyConfig,
}

/// Result of a topology prune
#[derive(Debug, Clone)]
pub struct TopologyOutcome {
    pub graph: KnowledgeGraph,

    /// Entities removed over all passes
    pub removed: usize,

    /// Passes that removed at least one entity
    pub passes: usize,
}

impl TopologyPruner {
    pub fn new(config: TopologyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    /// Whether `entity_type` contains any blacklisted substring
    pub fn is_blacklisted(&self, entity_type: &str) -> bool {
        self.config
            .blacklist
            .iter()
            .any(|term| !term.is_empty() && entity_type.contains(term.as_str()))
    }

    /// Prune until no pass removes anything (or `max_passes` is reached).
    ///
    /// A relationship whose other end was never extracted still counts towards degree; such
    /// relationships are dropped once pruning is done. Survivors keep their relative order.
    pub fn prune(&self, graph: &KnowledgeGraph) -> TopologyOutcome {
        let mut current = graph.clone();

        let initial = current.entity_count();
        let mut passes = 0;
        for _ in 0..self.config.max_passes.max(1) {
            let removed = self.prune_pass(&mut current);
            if removed == 0 {
                break;
            }
            passes += 1;
        }
        current.drop_dangling_relationships();

        let removed = initial - current.entity_count();
        log::info!(
            "Topology pruning removed {} redundant/isolated entities in {} pass(es)",
            removed,
            passes
        );
        TopologyOutcome {
            graph: current,
            removed,
            passes,
        }
    }

    /// One pass over degrees computed before any removal in this pass
    fn prune_pass(&self, graph: &mut KnowledgeGraph) -> usize {
        let degrees = graph.degrees_with_missing();
        graph.remove_entities_except(|entity| {
            let degree = degrees.get(&entity.id).copied().unwrap_or(0);
            if degree == 0 {
                log::debug!("Removing isolated entity '{}'", entity.id);
                return false;
            }
            // Hubs survive even when their type looks like background noise
            if degree <= 1 && self.is_blacklisted(&entity.entity_type) {
                log::debug!(
                    "Removing blacklisted entity '{}' (type '{}', degree {})",
                    entity.id,
                    entity.entity_type,
                    degree
                );
                return false;
            }
            true
        })
    }
}

impl Default for TopologyPruner {
    fn default() -> Self {
        Self::new(TopologyConfig::default())
    }
}
