use async_trait::async_trait;
use kgmatch_embeddings::{EmbeddingError, EmbeddingProvider, StubEmbedder};
use kgmatch_graph::{Entity, KnowledgeGraph, Relationship};
use kgmatch_pruning::{
    GraphRefiner, PruningConfig, PruningError, PruningPipeline, RefinementStatus,
};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Embeds every attribute whose key starts with "状态" onto the same direction, everything
/// else through the stub backend.
struct StatusAware {
    stub: StubEmbedder,
}

#[async_trait]
impl EmbeddingProvider for StatusAware {
    fn model_id(&self) -> &str {
        "status-aware"
    }

    async fn embed_batch(&self, texts: &[String]) -> kgmatch_embeddings::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                if t.starts_with("状态") || t.starts_with("开发进度") {
                    let mut v = vec![0.0; self.stub.dimension()];
                    v[0] = 1.0;
                    v
                } else {
                    self.stub.embed_one(t)
                }
            })
            .collect())
    }
}

struct Offline;

#[async_trait]
impl EmbeddingProvider for Offline {
    fn model_id(&self) -> &str {
        "offline"
    }

    async fn embed_batch(&self, _texts: &[String]) -> kgmatch_embeddings::Result<Vec<Vec<f32>>> {
        Err(EmbeddingError::Provider("network unreachable".to_string()))
    }
}

/// Returns the graph it receives plus an edge to an entity that does not exist
struct Sloppy {
    calls: AtomicUsize,
}

#[async_trait]
impl GraphRefiner for Sloppy {
    fn name(&self) -> &str {
        "sloppy"
    }

    async fn refine(&self, graph: &KnowledgeGraph) -> kgmatch_pruning::Result<KnowledgeGraph> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let mut relationships = graph.relationships().to_vec();
        relationships.push(Relationship::new("机器人", "幽灵", "看见"));
        Ok(KnowledgeGraph::from_parts(
            graph.entities().to_vec(),
            relationships,
        )?)
    }
}

struct Down;

#[async_trait]
impl GraphRefiner for Down {
    fn name(&self) -> &str {
        "down"
    }

    async fn refine(&self, _graph: &KnowledgeGraph) -> kgmatch_pruning::Result<KnowledgeGraph> {
        Err(PruningError::Refinement("503 Service Unavailable".to_string()))
    }
}

fn raw_graph() -> KnowledgeGraph {
    KnowledgeGraph::from_parts(
        vec![
            Entity::new("机器人", "产品")
                .with_attribute("状态", "开发中")
                .with_attribute("开发进度", "正在研发")
                .with_attribute("颜色", "白色"),
            Entity::new("噪音点A", "背景"),
            Entity::new("展会", "场合"),
            Entity::new("天空", "背景"),
        ],
        vec![
            Relationship::new("机器人", "展会", "展示于"),
            Relationship::new("展会", "天空", "位于"),
            Relationship::new("机器人", "LiDAR", "搭载"),
        ],
    )
    .unwrap()
}

fn ids(graph: &KnowledgeGraph) -> Vec<&str> {
    graph.entities().iter().map(|e| e.id.as_str()).collect()
}

#[tokio::test]
async fn full_pipeline_prunes_fuses_and_refines() {
    let refiner = Arc::new(Sloppy {
        calls: AtomicUsize::new(0),
    });
    let pipeline = PruningPipeline::new(
        PruningConfig::default(),
        Arc::new(StatusAware {
            stub: StubEmbedder::new(32),
        }),
        Some(refiner.clone()),
    );

    let pruned = pipeline.run(&raw_graph()).await.unwrap();

    assert_eq!(ids(&pruned.graph), vec!["机器人", "展会"]);
    let attrs: Vec<&str> = pruned
        .graph
        .entity("机器人")
        .unwrap()
        .attributes
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(attrs, vec!["状态", "颜色"]);

    assert_eq!(pruned.report.topology_removed, 2);
    assert_eq!(pruned.report.attributes_fused, 1);
    assert_eq!(pruned.report.refinement, RefinementStatus::Applied);
    assert_eq!(refiner.calls.load(Ordering::Relaxed), 1);

    for rel in pruned.graph.relationships() {
        assert!(pruned.graph.contains(&rel.source), "{rel:?}");
        assert!(pruned.graph.contains(&rel.target), "{rel:?}");
    }
}

#[tokio::test]
async fn service_outages_degrade_instead_of_failing() {
    let pipeline = PruningPipeline::new(
        PruningConfig::default(),
        Arc::new(Offline),
        Some(Arc::new(Down)),
    );

    let pruned = pipeline.run(&raw_graph()).await.unwrap();

    assert_eq!(ids(&pruned.graph), vec!["机器人", "展会"]);
    assert_eq!(pruned.graph.entity("机器人").unwrap().attributes.len(), 3);
    assert_eq!(pruned.report.fusion_degraded, vec!["机器人".to_string()]);
    assert_eq!(pruned.report.refinement, RefinementStatus::FellBack);
    assert!(pruned
        .report
        .refinement_error
        .as_deref()
        .unwrap()
        .contains("503"));
    assert!(pruned.graph.is_well_formed());
}

#[tokio::test]
async fn disabled_refinement_never_calls_the_service() {
    let refiner = Arc::new(Sloppy {
        calls: AtomicUsize::new(0),
    });
    let config = PruningConfig {
        refine: false,
        ..PruningConfig::default()
    };
    let pipeline = PruningPipeline::new(
        config,
        Arc::new(StubEmbedder::default()),
        Some(refiner.clone()),
    );

    let pruned = pipeline.run(&raw_graph()).await.unwrap();
    assert_eq!(pruned.report.refinement, RefinementStatus::Skipped);
    assert_eq!(refiner.calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn empty_graph_passes_through() {
    let pipeline = PruningPipeline::new(
        PruningConfig::default(),
        Arc::new(StubEmbedder::default()),
        None,
    );
    let pruned = pipeline.run(&KnowledgeGraph::new()).await.unwrap();
    assert!(pruned.graph.is_empty());
    assert_eq!(pruned.report.topology_removed, 0);
}
