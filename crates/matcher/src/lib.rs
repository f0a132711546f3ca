//! # kgmatch matcher
//!
//! Ranks a pruned knowledge graph against a catalogue of reference topics.
//!
//! ## Architecture
//!
//! ```text
//! KnowledgeGraph ──> candidate fragments (id / attribute / relation / full)
//!                          │
//! KnowledgeBase ──────────┤  topic embeddings cached into the KB file
//!                          │
//!                          ├─ emb_sim:       max cosine(topic, fragment)      × alpha
//!                          ├─ keyword_score: keyword or alias substring hit   × beta
//!                          └─ centrality:    degree centrality of entities    × gamma
//!                          │
//!                          ▼
//!               stable sort ─> selection rule ─> 6_core_concepts.json
//! ```

mod candidates;
mod error;
mod knowledge_base;
mod ranker;
mod selection;

pub use candidates::{extract_candidates, Candidate, CandidateKind};
pub use error::{MatchError, Result};
pub use knowledge_base::{ensure_topic_embeddings, KnowledgeBase, Subject, Topic};
pub use ranker::{
    score_topics, sort_by_score, CentralityMode, Evidence, MatchConfig, MatchResult,
    ScoreRecord, ScoreWeights, TopicMatcher, CORE_CONCEPTS_FILE,
};
pub use selection::SelectionThresholds;
