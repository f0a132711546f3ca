use crate::config::FusionConfig;
use crate::error::Result;
use kgmatch_embeddings::{cosine_similarity, embed_exact, EmbeddingProvider};
use kgmatch_graph::{Attributes, Entity, KnowledgeGraph};
use std::sync::Arc;

/// Embedding-based deduplication of near-identical attributes within one entity.
pub struct AttributeFuser {
    provider: Arc<dyn EmbeddingProvider>,
    config: FusionConfig,
}

/// Result of a fusion pass
#[derive(Debug, Clone)]
pub struct FusionOutcome {
    pub graph: KnowledgeGraph,

    /// Attribute entries dropped as redundant
    pub attributes_removed: usize,

    /// Entities left untouched because their embedding call failed
    pub degraded_entities: Vec<String>,
}

impl AttributeFuser {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: FusionConfig) -> Self {
        Self { provider, config }
    }

    pub fn threshold(&self) -> f32 {
        self.config.threshold
    }

    /// Fuse attributes of every entity with at least two of them.
    ///
    /// One embedding batch per entity. A failing batch leaves that entity unchanged and the
    /// pass moves on to the next one.
    pub async fn fuse(&self, graph: &KnowledgeGraph) -> Result<FusionOutcome> {
        let mut entities = Vec::with_capacity(graph.entity_count());
        let mut attributes_removed = 0;
        let mut degraded_entities = Vec::new();

        for entity in graph.entities() {
            if entity.attributes.len() < 2 {
                entities.push(entity.clone());
                continue;
            }

            match self.fuse_entity(entity).await {
                Ok(fused) => {
                    attributes_removed += entity.attributes.len() - fused.attributes.len();
                    entities.push(fused);
                }
                Err(err) => {
                    log::warn!(
                        "Attribute fusion skipped for '{}' (embedding failed): {}",
                        entity.id,
                        err
                    );
                    degraded_entities.push(entity.id.clone());
                    entities.push(entity.clone());
                }
            }
        }

        log::info!(
            "Attribute fusion removed {} redundant attributes ({} entities degraded)",
            attributes_removed,
            degraded_entities.len()
        );

        Ok(FusionOutcome {
            graph: graph.with_entities(entities)?,
            attributes_removed,
            degraded_entities,
        })
    }

    async fn fuse_entity(&self, entity: &Entity) -> kgmatch_embeddings::Result<Entity> {
        let texts: Vec<String> = entity
            .attributes
            .iter()
            .map(|(key, value)| attribute_text(key, value))
            .collect();
        let vectors = embed_exact(self.provider.as_ref(), &texts).await?;

        let redundant = redundant_attributes(&vectors, self.config.threshold);
        let fused: Attributes = entity
            .attributes
            .iter()
            .zip(redundant.iter())
            .filter(|(_, is_redundant)| !**is_redundant)
            .map(|((key, value), _)| (key.clone(), value.clone()))
            .collect();

        if fused.len() < entity.attributes.len() {
            log::debug!(
                "Fused '{}': {} -> {} attributes",
                entity.id,
                entity.attributes.len(),
                fused.len()
            );
        }
        Ok(entity.with_attributes(fused))
    }
}

/// Text fragment embedded for an attribute
pub fn attribute_text(key: &str, value: &str) -> String {
    format!("{key}: {value}")
}

/// Mark redundant positions: for every pair `i < j` of still-live positions whose
/// similarity is strictly above `threshold`, the later one (`j`) is redundant.
pub fn redundant_attributes(vectors: &[Vec<f32>], threshold: f32) -> Vec<bool> {
    let mut redundant = vec![false; vectors.len()];
    for i in 0..vectors.len() {
        if redundant[i] {
            continue;
        }
        for j in (i + 1)..vectors.len() {
            if redundant[j] {
                continue;
            }
            if cosine_similarity(&vectors[i], &vectors[j]) > threshold {
                redundant[j] = true;
            }
        }
    }
    redundant
}
