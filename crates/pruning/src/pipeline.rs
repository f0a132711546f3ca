use crate::config::PruningConfig;
use crate::error::Result;
use crate::fusion::AttributeFuser;
use crate::refine::{refine_or_keep, GraphRefiner, RefinementStatus};
use crate::topology::TopologyPruner;
use kgmatch_embeddings::EmbeddingProvider;
use kgmatch_graph::KnowledgeGraph;
use serde::Serialize;
use std::sync::Arc;

/// Topology -> attribute fusion -> reasoning refinement, strictly in that order.
pub struct PruningPipeline {
    topology: TopologyPruner,
    fuser: AttributeFuser,
    refiner: Option<Arc<dyn GraphRefiner>>,
}

/// What each stage did
#[derive(Debug, Clone, Serialize)]
pub struct PruningReport {
    pub topology_removed: usize,
    pub topology_passes: usize,
    pub attributes_fused: usize,
    pub fusion_degraded: Vec<String>,
    pub refinement: RefinementStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refinement_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PrunedGraph {
    pub graph: KnowledgeGraph,
    pub report: PruningReport,
}

impl PruningPipeline {
    /// `refiner` is ignored when `config.refine` is false
    pub fn new(
        config: PruningConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        refiner: Option<Arc<dyn GraphRefiner>>,
    ) -> Self {
        Self {
            topology: TopologyPruner::new(config.topology),
            fuser: AttributeFuser::new(embedder, config.fusion),
            refiner: if config.refine { refiner } else { None },
        }
    }

    pub async fn run(&self, raw: &KnowledgeGraph) -> Result<PrunedGraph> {
        log::info!(
            "Pruning graph: {} entities, {} relationships, {} attributes",
            raw.entity_count(),
            raw.relationship_count(),
            raw.attribute_count()
        );

        // Step 1: topology
        let topology = self.topology.prune(raw);

        // Step 2: attribute fusion
        let fusion = self.fuser.fuse(&topology.graph).await?;
        let mut fused = fusion.graph;
        fused.drop_dangling_relationships();

        // Step 3: refinement
        let (graph, refinement, refinement_error) = match &self.refiner {
            Some(refiner) => {
                let outcome = refine_or_keep(refiner.as_ref(), fused).await;
                (outcome.graph, outcome.status, outcome.error)
            }
            None => {
                log::info!("Refinement disabled; keeping fused graph");
                (fused, RefinementStatus::Skipped, None)
            }
        };
        debug_assert!(graph.is_well_formed());

        log::info!(
            "Pruned graph: {} entities, {} relationships, {} attributes",
            graph.entity_count(),
            graph.relationship_count(),
            graph.attribute_count()
        );

        Ok(PrunedGraph {
            graph,
            report: PruningReport {
                topology_removed: topology.removed,
                topology_passes: topology.passes,
                attributes_fused: fusion.attributes_removed,
                fusion_degraded: fusion.degraded_entities,
                refinement,
                refinement_error,
            },
        })
    }
}
