use crate::candidates::{extract_candidates, Candidate, CandidateKind};
use crate::error::Result;
use crate::knowledge_base::{ensure_topic_embeddings, KnowledgeBase, Topic};
use crate::selection::SelectionThresholds;
use kgmatch_embeddings::{cosine_similarity, embed_exact, EmbeddingProvider};
use kgmatch_graph::KnowledgeGraph;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File name of the match artifact inside the output directory
pub const CORE_CONCEPTS_FILE: &str = "6_core_concepts.json";

/// Weights of the combined score (not required to sum to 1)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Embedding similarity
    pub alpha: f64,
    /// Keyword / alias hit
    pub beta: f64,
    /// Graph centrality
    pub gamma: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            alpha: 0.7,
            beta: 0.2,
            gamma: 0.1,
        }
    }
}

impl ScoreWeights {
    pub fn combine(&self, emb_sim: f64, keyword_score: f64, centrality: f64) -> f64 {
        self.alpha * emb_sim + self.beta * keyword_score + self.gamma * centrality
    }
}

/// Which entities feed a topic's centrality component
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentralityMode {
    /// Most central entity referenced by any candidate; the same value for every topic
    #[default]
    AnyCandidate,
    /// Most central entity among candidates containing one of the topic's keywords
    KeywordEvidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub weights: ScoreWeights,
    pub thresholds: SelectionThresholds,
    /// Length of the reported ranking
    pub top_k: usize,
    pub centrality: CentralityMode,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            thresholds: SelectionThresholds::default(),
            top_k: 10,
            centrality: CentralityMode::default(),
        }
    }
}

/// Best-matching fragment for a topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub candidate: String,
    pub sim: f64,
    pub candidate_type: CandidateKind,
}

/// Scores of one topic against one graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub subject: String,
    pub id: String,
    pub title: String,
    pub emb_sim: f64,
    pub keyword_score: f64,
    pub centrality: f64,
    pub combined_score: f64,
    pub evidence: Option<Evidence>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Leading `top_k` topics, best first
    pub candidates: Vec<ScoreRecord>,
    pub selected: Vec<ScoreRecord>,
}

impl MatchResult {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Write `6_core_concepts.json` into `out_dir` (created if needed)
    pub async fn save(&self, out_dir: impl AsRef<Path>) -> Result<PathBuf> {
        let out_dir = out_dir.as_ref();
        tokio::fs::create_dir_all(out_dir).await?;
        let path = out_dir.join(CORE_CONCEPTS_FILE);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(self)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        log::info!("Core concepts saved to {:?}", path);
        Ok(path)
    }
}

/// Scores a pruned graph against every topic of a knowledge base
pub struct TopicMatcher {
    config: MatchConfig,
    provider: Arc<dyn EmbeddingProvider>,
}

impl TopicMatcher {
    pub fn new(config: MatchConfig, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { config, provider }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Fill missing topic embeddings. Failures are logged and leave the knowledge base as is.
    pub async fn embed_knowledge_base(&self, kb: &mut KnowledgeBase) -> usize {
        match ensure_topic_embeddings(kb, self.provider.as_ref()).await {
            Ok(filled) => {
                if filled > 0 {
                    log::info!("Cached embeddings for {} topics", filled);
                }
                filled
            }
            Err(err) => {
                log::warn!(
                    "Knowledge base embedding failed, ranking without embeddings: {}",
                    err
                );
                0
            }
        }
    }

    /// Rank every topic of `kb` against `graph` and apply the selection rule
    pub async fn rank(&self, graph: &KnowledgeGraph, kb: &KnowledgeBase) -> Result<MatchResult> {
        if kb.topic_count() == 0 {
            log::info!("Knowledge base has no topics; nothing to rank");
            return Ok(MatchResult::default());
        }

        let candidates = extract_candidates(graph)?;
        let texts: Vec<String> = candidates
            .iter()
            .map(|c| c.embedding_text().to_string())
            .collect();
        let embeddings = match embed_exact(self.provider.as_ref(), &texts).await {
            Ok(vectors) => Some(vectors),
            Err(err) => {
                log::warn!("Candidate embedding failed, using keywords only: {}", err);
                None
            }
        };

        let centrality = graph.degree_centrality();
        let mut scores = score_topics(
            &self.config,
            kb,
            &candidates,
            embeddings.as_deref(),
            &centrality,
        );
        sort_by_score(&mut scores);

        let selected = self.config.thresholds.select(&scores).to_vec();
        scores.truncate(self.config.top_k);

        if let Some(top) = selected.first() {
            log::info!(
                "Top topic: {}/{} '{}' ({:.3}), {} selected",
                top.subject,
                top.id,
                top.title,
                top.combined_score,
                selected.len()
            );
        }

        Ok(MatchResult {
            candidates: scores,
            selected,
        })
    }

    /// Load graph and knowledge base, cache new topic embeddings into `kb_path`, rank, and
    /// write the artifact into `out_dir`.
    pub async fn match_files(
        &self,
        kg_path: impl AsRef<Path>,
        kb_path: impl AsRef<Path>,
        out_dir: impl AsRef<Path>,
    ) -> Result<MatchResult> {
        let graph = KnowledgeGraph::load(kg_path).await?;
        let kb_path = kb_path.as_ref();
        let mut kb = KnowledgeBase::load(kb_path).await?;

        if self.embed_knowledge_base(&mut kb).await > 0 {
            kb.save(kb_path).await?;
        }

        let result = self.rank(&graph, &kb).await?;
        result.save(out_dir).await?;
        Ok(result)
    }
}

/// Stable descending sort on `combined_score`; ties keep knowledge-base order
pub fn sort_by_score(scores: &mut [ScoreRecord]) {
    scores.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(Ordering::Equal)
    });
}

/// Score every topic in knowledge-base order.
///
/// `embeddings` holds one vector per candidate, or `None` when the candidate batch failed.
/// Embedding similarity only contributes when every topic and the candidates are embedded.
pub fn score_topics(
    config: &MatchConfig,
    kb: &KnowledgeBase,
    candidates: &[Candidate],
    embeddings: Option<&[Vec<f32>]>,
    centrality: &HashMap<String, f64>,
) -> Vec<ScoreRecord> {
    let embeddings = embeddings.filter(|_| kb.is_fully_embedded());
    if embeddings.is_none() {
        log::debug!("Embedding similarity disabled for this ranking");
    }

    let lowered: Vec<String> = candidates.iter().map(|c| c.text.to_lowercase()).collect();
    let any_candidate = max_centrality(candidates.iter(), centrality);

    kb.topics()
        .map(|(subject, topic)| {
            let (emb_sim, evidence) = match (embeddings, topic.embedding.as_deref()) {
                (Some(vectors), Some(topic_vec)) => best_similarity(topic_vec, candidates, vectors),
                _ => (0.0, None),
            };

            let terms = topic.match_terms();
            let hits: Vec<&Candidate> = candidates
                .iter()
                .zip(lowered.iter())
                .filter(|(_, text)| terms.iter().any(|term| text.contains(term.as_str())))
                .map(|(candidate, _)| candidate)
                .collect();
            let keyword_score = if hits.is_empty() { 0.0 } else { 1.0 };

            let cent = match config.centrality {
                CentralityMode::AnyCandidate => any_candidate,
                CentralityMode::KeywordEvidence => max_centrality(hits.into_iter(), centrality),
            };

            let combined_score = config.weights.combine(emb_sim, keyword_score, cent);
            log::debug!(
                "{}/{}: emb={:.3} kw={} cent={:.3} -> {:.3}",
                subject,
                topic.id,
                emb_sim,
                keyword_score,
                cent,
                combined_score
            );

            record(subject, topic, emb_sim, keyword_score, cent, combined_score, evidence)
        })
        .collect()
}

/// Highest similarity above zero and the fragment it came from
fn best_similarity(
    topic_vec: &[f32],
    candidates: &[Candidate],
    vectors: &[Vec<f32>],
) -> (f64, Option<Evidence>) {
    let mut best = 0.0;
    let mut evidence = None;
    for (candidate, vector) in candidates.iter().zip(vectors) {
        let sim = f64::from(cosine_similarity(topic_vec, vector));
        if sim > best {
            best = sim;
            evidence = Some(Evidence {
                candidate: candidate.text.clone(),
                sim,
                candidate_type: candidate.kind,
            });
        }
    }
    (best, evidence)
}

fn max_centrality<'a>(
    candidates: impl Iterator<Item = &'a Candidate>,
    centrality: &HashMap<String, f64>,
) -> f64 {
    candidates
        .filter_map(|c| c.entity_id.as_ref())
        .filter_map(|id| centrality.get(id).copied())
        .fold(0.0, f64::max)
}

fn record(
    subject: &str,
    topic: &Topic,
    emb_sim: f64,
    keyword_score: f64,
    centrality: f64,
    combined_score: f64,
    evidence: Option<Evidence>,
) -> ScoreRecord {
    ScoreRecord {
        subject: subject.to_string(),
        id: topic.id.clone(),
        title: topic.title.clone(),
        emb_sim,
        keyword_score,
        centrality,
        combined_score,
        evidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgmatch_embeddings::StubEmbedder;
    use kgmatch_graph::{Entity, Relationship};
    use pretty_assertions::assert_eq;

    fn graph() -> KnowledgeGraph {
        // hub has degree 2 of a possible 2 -> centrality 1.0, the leaves 0.5
        KnowledgeGraph::from_parts(
            vec![
                Entity::new("小车", "物体").with_attribute("运动", "匀加速"),
                Entity::new("斜面", "物体"),
                Entity::new("弹簧", "物体"),
            ],
            vec![
                Relationship::new("小车", "斜面", "沿着"),
                Relationship::new("小车", "弹簧", "压缩"),
            ],
        )
        .unwrap()
    }

    fn kb(json: &str) -> KnowledgeBase {
        KnowledgeBase::from_json_str(json).unwrap()
    }

    #[test]
    fn keyword_hits_are_case_insensitive_substrings() {
        let kb = kb(r#"{"subjects": {"physics": {"topics": [
            {"id": "P1", "title": "匀变速", "keywords": ["加速"]},
            {"id": "P2", "title": "胡克定律", "keywords": [""], "aliases": ["SPRING"]},
            {"id": "P3", "title": "电路", "keywords": ["电阻"]}
        ]}}}"#);
        let graph = KnowledgeGraph::from_parts(
            vec![Entity::new("spring", "物体").with_attribute("运动", "匀加速")],
            Vec::new(),
        )
        .unwrap();
        let candidates = extract_candidates(&graph).unwrap();

        let scores = score_topics(
            &MatchConfig::default(),
            &kb,
            &candidates,
            None,
            &HashMap::new(),
        );
        let kw: Vec<f64> = scores.iter().map(|s| s.keyword_score).collect();
        assert_eq!(kw, vec![1.0, 1.0, 0.0]);
        assert!(scores.iter().all(|s| s.emb_sim == 0.0 && s.evidence.is_none()));
    }

    #[test]
    fn centrality_modes() {
        let graph = graph();
        let kb = kb(r#"{"subjects": {"physics": {"topics": [
            {"id": "P1", "title": "斜面", "keywords": ["斜面"]},
            {"id": "P2", "title": "光学", "keywords": ["透镜"]}
        ]}}}"#);
        let candidates = extract_candidates(&graph).unwrap();
        let centrality = graph.degree_centrality();

        let any = score_topics(&MatchConfig::default(), &kb, &candidates, None, &centrality);
        assert_eq!(any[0].centrality, 1.0);
        assert_eq!(any[1].centrality, 1.0);

        let config = MatchConfig {
            centrality: CentralityMode::KeywordEvidence,
            ..MatchConfig::default()
        };
        let evidence = score_topics(&config, &kb, &candidates, None, &centrality);
        // "斜面" appears in the id fragment of 斜面 (0.5) and in the relation of 小车 (1.0)
        assert_eq!(evidence[0].centrality, 1.0);
        assert_eq!(evidence[1].centrality, 0.0);
    }

    #[test]
    fn embedding_requires_every_topic_embedded() {
        let graph = graph();
        let candidates = extract_candidates(&graph).unwrap();
        let stub = StubEmbedder::new(16);
        let vectors: Vec<Vec<f32>> = candidates
            .iter()
            .map(|c| stub.embed_one(c.embedding_text()))
            .collect();

        let mut kb = kb(r#"{"subjects": {"physics": {"topics": [
            {"id": "P1", "title": "a"}, {"id": "P2", "title": "b"}
        ]}}}"#);
        // P1 points exactly at the "斜面" fragment
        kb.subjects.get_mut("physics").unwrap().topics[0].embedding =
            Some(stub.embed_one("斜面"));

        let partial = score_topics(
            &MatchConfig::default(),
            &kb,
            &candidates,
            Some(&vectors),
            &HashMap::new(),
        );
        assert_eq!(partial[0].emb_sim, 0.0);

        kb.subjects.get_mut("physics").unwrap().topics[1].embedding = Some(vec![0.0; 16]);
        let full = score_topics(
            &MatchConfig::default(),
            &kb,
            &candidates,
            Some(&vectors),
            &HashMap::new(),
        );
        assert!((full[0].emb_sim - 1.0).abs() < 1e-5);
        let evidence = full[0].evidence.as_ref().unwrap();
        assert_eq!(evidence.candidate, "斜面");
        assert_eq!(evidence.candidate_type, CandidateKind::Id);
        assert!((full[0].combined_score - 0.7 * full[0].emb_sim).abs() < 1e-6);

        // a zero vector never beats the 0.0 starting point
        assert_eq!(full[1].emb_sim, 0.0);
        assert!(full[1].evidence.is_none());
    }

    #[test]
    fn sort_is_stable_on_ties() {
        let mut scores: Vec<ScoreRecord> = [("A", 0.2), ("B", 0.5), ("C", 0.2), ("D", 0.5)]
            .iter()
            .map(|&(id, score)| ScoreRecord {
                subject: "s".to_string(),
                id: id.to_string(),
                title: String::new(),
                emb_sim: 0.0,
                keyword_score: 0.0,
                centrality: 0.0,
                combined_score: score,
                evidence: None,
            })
            .collect();
        sort_by_score(&mut scores);
        let ids: Vec<&str> = scores.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["B", "D", "A", "C"]);
    }

    #[tokio::test]
    async fn empty_knowledge_base_yields_empty_result() {
        let matcher = TopicMatcher::new(MatchConfig::default(), Arc::new(StubEmbedder::default()));
        let result = matcher.rank(&graph(), &KnowledgeBase::default()).await.unwrap();
        assert_eq!(result, MatchResult::default());
    }

    #[tokio::test]
    async fn ranking_truncates_after_selection() {
        let kb = kb(r#"{"subjects": {"physics": {"topics": [
            {"id": "P1", "title": "x", "keywords": ["透镜"]},
            {"id": "P2", "title": "y", "keywords": ["电阻"]}
        ]}}}"#);
        let config = MatchConfig {
            top_k: 1,
            ..MatchConfig::default()
        };
        let matcher = TopicMatcher::new(config, Arc::new(StubEmbedder::default()));
        let result = matcher.rank(&graph(), &kb).await.unwrap();

        assert_eq!(result.candidates.len(), 1);
        // both topics tie at gamma * 1.0, well below mid: two are selected
        assert_eq!(result.selected.len(), 2);
    }
}
