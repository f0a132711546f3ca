use async_trait::async_trait;
use kgmatch_embeddings::{EmbeddingError, EmbeddingProvider, StubEmbedder};
use kgmatch_graph::{Entity, KnowledgeGraph, Relationship};
use kgmatch_matcher::{
    CandidateKind, KnowledgeBase, MatchConfig, MatchResult, TopicMatcher, CORE_CONCEPTS_FILE,
};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const KB: &str = r#"{
  "subjects": {
    "physics": {
      "display_name": "物理",
      "topics": [
        {"id": "P-NEWTON2", "title": "牛顿第二定律", "aliases": ["F=ma"],
         "keywords": ["加速度", "合力"], "description": "力与加速度的关系"},
        {"id": "P-INCLINE", "title": "斜面受力分析", "keywords": ["斜面"],
         "description": "物体在斜面上的受力"},
        {"id": "P-OPTICS", "title": "凸透镜成像", "keywords": ["透镜"],
         "description": "焦距与成像"}
      ]
    },
    "chemistry": {
      "display_name": "化学",
      "topics": [
        {"id": "C-REDOX", "title": "氧化还原反应", "keywords": ["氧化"],
         "description": "电子转移"}
      ]
    }
  }
}"#;

struct Offline;

#[async_trait]
impl EmbeddingProvider for Offline {
    fn model_id(&self) -> &str {
        "offline"
    }

    async fn embed_batch(&self, _texts: &[String]) -> kgmatch_embeddings::Result<Vec<Vec<f32>>> {
        Err(EmbeddingError::Provider("connection refused".to_string()))
    }
}

async fn setup(temp: &TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
    let kg_path = temp.path().join("3_KG_P.json");
    let kb_path = temp.path().join("exam_kb.json");
    let graph = KnowledgeGraph::from_parts(
        vec![
            Entity::new("小车", "物体").with_attribute("运动状态", "以加速度2m/s²下滑"),
            Entity::new("斜面", "物体").with_attribute("倾角", "30°"),
        ],
        vec![Relationship::new("小车", "斜面", "沿着")],
    )
    .unwrap();
    graph.save(&kg_path).await.unwrap();
    tokio::fs::write(&kb_path, KB).await.unwrap();
    (kg_path, kb_path)
}

fn ids(records: &[kgmatch_matcher::ScoreRecord]) -> Vec<&str> {
    records.iter().map(|r| r.id.as_str()).collect()
}

async fn read_artifact(out: &Path) -> MatchResult {
    MatchResult::load(out.join(CORE_CONCEPTS_FILE)).await.unwrap()
}

#[tokio::test]
async fn topic_embeddings_are_cached_and_not_recomputed() {
    let temp = TempDir::new().unwrap();
    let (kg_path, kb_path) = setup(&temp).await;
    let out = temp.path().join("out");

    let stub = Arc::new(StubEmbedder::new(32));
    let matcher = TopicMatcher::new(MatchConfig::default(), stub.clone());

    matcher.match_files(&kg_path, &kb_path, &out).await.unwrap();
    // one batch for the knowledge base, one for the candidates
    assert_eq!(stub.batch_calls(), 2);

    let cached = KnowledgeBase::load(&kb_path).await.unwrap();
    assert!(cached.is_fully_embedded());
    let subjects: Vec<&str> = cached.subjects.keys().map(String::as_str).collect();
    assert_eq!(subjects, vec!["physics", "chemistry"]);

    matcher.match_files(&kg_path, &kb_path, &out).await.unwrap();
    assert_eq!(stub.batch_calls(), 3);
    assert_eq!(KnowledgeBase::load(&kb_path).await.unwrap(), cached);
}

#[tokio::test]
async fn exact_embedding_match_is_selected_alone() {
    let temp = TempDir::new().unwrap();
    let (kg_path, kb_path) = setup(&temp).await;
    let out = temp.path().join("out");
    let stub = Arc::new(StubEmbedder::new(32));

    // Pin the incline topic onto the relation fragment, let the rest be embedded lazily
    let mut kb = KnowledgeBase::load(&kb_path).await.unwrap();
    kb.subjects.get_mut("physics").unwrap().topics[1].embedding =
        Some(stub.embed_one("小车 沿着 斜面"));
    kb.save(&kb_path).await.unwrap();

    let matcher = TopicMatcher::new(MatchConfig::default(), stub.clone());
    let result = matcher.match_files(&kg_path, &kb_path, &out).await.unwrap();

    let top = &result.candidates[0];
    assert_eq!(top.id, "P-INCLINE");
    assert_eq!(top.subject, "physics");
    assert_eq!(top.keyword_score, 1.0);
    assert_eq!(top.centrality, 1.0);
    assert!(top.combined_score >= 0.80);
    let evidence = top.evidence.as_ref().unwrap();
    assert_eq!(evidence.candidate, "小车 沿着 斜面");
    assert_eq!(evidence.candidate_type, CandidateKind::Relation);

    assert_eq!(ids(&result.selected), vec!["P-INCLINE"]);
    assert_eq!(result.candidates.len(), 4);
    assert_eq!(read_artifact(&out).await, result);
}

#[tokio::test]
async fn offline_provider_falls_back_to_keywords() {
    let temp = TempDir::new().unwrap();
    let (kg_path, kb_path) = setup(&temp).await;
    let out = temp.path().join("out");
    let before = tokio::fs::read_to_string(&kb_path).await.unwrap();

    let matcher = TopicMatcher::new(MatchConfig::default(), Arc::new(Offline));
    let result = matcher.match_files(&kg_path, &kb_path, &out).await.unwrap();

    // the knowledge base file is not rewritten when nothing was embedded
    assert_eq!(tokio::fs::read_to_string(&kb_path).await.unwrap(), before);

    assert!(result.candidates.iter().all(|r| r.emb_sim == 0.0));
    // keyword hits score 0.2 + 0.1, the rest 0.1; ties keep knowledge-base order
    assert_eq!(
        ids(&result.candidates),
        vec!["P-NEWTON2", "P-INCLINE", "P-OPTICS", "C-REDOX"]
    );
    assert_eq!(ids(&result.selected), vec!["P-NEWTON2", "P-INCLINE"]);
}

#[tokio::test]
async fn missing_graph_file_is_an_error() {
    let temp = TempDir::new().unwrap();
    let (_, kb_path) = setup(&temp).await;
    let matcher = TopicMatcher::new(MatchConfig::default(), Arc::new(StubEmbedder::default()));

    let err = matcher
        .match_files(temp.path().join("missing.json"), &kb_path, temp.path())
        .await;
    assert!(err.is_err());
    assert!(!temp.path().join(CORE_CONCEPTS_FILE).exists());
}
