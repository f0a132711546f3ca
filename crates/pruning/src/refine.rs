use crate::error::Result;
use async_trait::async_trait;
use kgmatch_graph::KnowledgeGraph;
use serde::Serialize;

/// Reasoning-service seam for the final logical clean-up of a graph.
///
/// Implementations take a graph and return a graph of the same schema. Errors (transport,
/// quota, unparsable output) are reported as `Err`; the caller decides how to degrade.
#[async_trait]
pub trait GraphRefiner: Send + Sync {
    fn name(&self) -> &str;

    async fn refine(&self, graph: &KnowledgeGraph) -> Result<KnowledgeGraph>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefinementStatus {
    /// The service answered and its graph was adopted
    Applied,
    /// Refinement disabled; graph passed through
    Skipped,
    /// The service failed; the pre-call graph was kept
    FellBack,
}

#[derive(Debug, Clone)]
pub struct RefineOutcome {
    pub graph: KnowledgeGraph,
    pub status: RefinementStatus,
    pub error: Option<String>,
}

/// Run the refiner; on any failure keep `graph` unchanged.
pub async fn refine_or_keep(refiner: &dyn GraphRefiner, graph: KnowledgeGraph) -> RefineOutcome {
    log::info!("Refining graph with {}", refiner.name());
    match refiner.refine(&graph).await {
        Ok(mut refined) => {
            let dropped = refined.drop_dangling_relationships();
            if dropped > 0 {
                log::warn!(
                    "Refined graph referenced missing entities; dropped {} relationships",
                    dropped
                );
            }
            log::info!(
                "Refinement applied: {} -> {} entities, {} -> {} relationships",
                graph.entity_count(),
                refined.entity_count(),
                graph.relationship_count(),
                refined.relationship_count()
            );
            RefineOutcome {
                graph: refined,
                status: RefinementStatus::Applied,
                error: None,
            }
        }
        Err(err) => {
            log::warn!("Refinement failed, keeping previous graph: {}", err);
            RefineOutcome {
                graph,
                status: RefinementStatus::FellBack,
                error: Some(err.to_string()),
            }
        }
    }
}

/// Instruction sent alongside the serialized graph
pub const REFINEMENT_INSTRUCTIONS: &str = "\
You are a knowledge graph expert. The graph below has already been cleaned by topology \
pruning and embedding-based attribute deduplication. Perform the final logical pruning:
1. Check every relationship and delete the ones that are logically inconsistent or wrong.
2. Merge entities that refer to the same real-world thing under different ids; keep one id, \
union their attributes, and rewrite relationships to point at the kept id.
3. Keep ids, types, attribute keys and values in their original language.
Return only the refined graph as JSON with exactly this schema and no Markdown fences:
{\"entities\": [{\"id\": str, \"type\": str, \"attributes\": {str: str}}], \
\"relationships\": [{\"source\": str, \"target\": str, \"relation\": str}]}";

/// Full prompt for a reasoning service
pub fn refinement_prompt(graph: &KnowledgeGraph) -> Result<String> {
    let json = graph.to_json_pretty()?;
    Ok(format!("{REFINEMENT_INSTRUCTIONS}\n\nInput graph:\n{json}\n"))
}
