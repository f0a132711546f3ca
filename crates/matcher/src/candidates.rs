use crate::error::Result;
use kgmatch_graph::KnowledgeGraph;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Where a candidate fragment was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateKind {
    Id,
    Attribute,
    Relation,
    Full,
}

impl CandidateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Attribute => "attribute",
            Self::Relation => "relation",
            Self::Full => "full",
        }
    }
}

/// Text fragment of a graph that gets compared against topics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub text: String,

    /// Entity the fragment belongs to (the source entity for relations, none for `Full`)
    pub entity_id: Option<String>,

    pub kind: CandidateKind,
}

impl Candidate {
    fn new(text: String, entity_id: Option<&str>, kind: CandidateKind) -> Self {
        Self {
            text,
            entity_id: entity_id.map(str::to_string),
            kind,
        }
    }

    /// Text sent to the embedding provider
    pub fn embedding_text(&self) -> &str {
        self.text.trim()
    }
}

/// Flatten a graph into candidate fragments.
///
/// Order: per entity its id then its attributes, then every relationship, then the whole graph
/// as compact JSON. Fragments with identical text are kept once (first occurrence).
pub fn extract_candidates(graph: &KnowledgeGraph) -> Result<Vec<Candidate>> {
    let mut raw = Vec::new();

    for entity in graph.entities() {
        raw.push(Candidate::new(
            entity.id.clone(),
            Some(&entity.id),
            CandidateKind::Id,
        ));
        for (key, value) in entity.attributes.iter() {
            raw.push(Candidate::new(
                format!("{key}: {value}"),
                Some(&entity.id),
                CandidateKind::Attribute,
            ));
        }
    }

    for rel in graph.relationships() {
        raw.push(Candidate::new(
            format!("{} {} {}", rel.source, rel.relation, rel.target),
            Some(&rel.source),
            CandidateKind::Relation,
        ));
    }

    raw.push(Candidate::new(
        graph.to_json_compact()?,
        None,
        CandidateKind::Full,
    ));

    let mut seen = HashSet::new();
    let candidates: Vec<Candidate> = raw
        .into_iter()
        .filter(|candidate| seen.insert(candidate.text.clone()))
        .collect();

    log::debug!("Extracted {} candidate fragments", candidates.len());
    Ok(candidates)
}
