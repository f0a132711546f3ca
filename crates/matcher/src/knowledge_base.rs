use crate::error::Result;
use kgmatch_embeddings::{embed_exact, EmbeddingProvider};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// A reference topic in the knowledge base
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub aliases: Vec<String>,

    /// Free-form difficulty or curriculum level (string or number in practice).
    /// `Some(Value::Null)` is an explicit `"level": null`; `None` means the key was absent.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub level: Option<Value>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub examples: Vec<Value>,

    /// Cached embedding; computed once and persisted with the knowledge base
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,

    /// Fields this crate does not interpret, carried through load/save untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Keeps an explicit `null` distinguishable from a missing key
fn present_value<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Topic {
    /// An empty vector counts as missing
    pub fn has_embedding(&self) -> bool {
        self.embedding.as_ref().is_some_and(|e| !e.is_empty())
    }

    /// Text embedded for this topic: title, keywords and description
    pub fn embedding_text(&self) -> String {
        format!(
            "{} {} {}",
            self.title,
            self.keywords.join(" "),
            self.description
        )
    }

    /// Keywords and aliases, lowercased, empty entries dropped
    pub fn match_terms(&self) -> Vec<String> {
        self.keywords
            .iter()
            .chain(self.aliases.iter())
            .filter(|term| !term.is_empty())
            .map(|term| term.to_lowercase())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub topics: Vec<Topic>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Subjects keyed by name, in file order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    #[serde(default)]
    pub subjects: IndexMap<String, Subject>,
}

impl KnowledgeBase {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let kb: Self = serde_json::from_slice(&bytes)?;
        log::info!(
            "Loaded knowledge base {:?}: {} subjects, {} topics",
            path,
            kb.subjects.len(),
            kb.topic_count()
        );
        Ok(kb)
    }

    /// Save with pretty formatting (write-then-rename)
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let bytes = serde_json::to_vec_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        log::info!("Knowledge base saved to {:?}", path);
        Ok(())
    }

    pub fn topic_count(&self) -> usize {
        self.subjects.values().map(|s| s.topics.len()).sum()
    }

    /// `(subject name, topic)` pairs, subjects and topics in file order
    pub fn topics(&self) -> impl Iterator<Item = (&str, &Topic)> {
        self.subjects.iter().flat_map(|(name, subject)| {
            subject
                .topics
                .iter()
                .map(move |topic| (name.as_str(), topic))
        })
    }

    pub fn topics_mut(&mut self) -> impl Iterator<Item = &mut Topic> {
        self.subjects
            .values_mut()
            .flat_map(|subject| subject.topics.iter_mut())
    }

    pub fn missing_embeddings(&self) -> usize {
        self.topics().filter(|(_, t)| !t.has_embedding()).count()
    }

    pub fn is_fully_embedded(&self) -> bool {
        self.topics().all(|(_, t)| t.has_embedding())
    }
}

/// Embed every topic that has no embedding yet, in a single provider call.
///
/// Returns how many topics were filled. On error nothing is written back.
pub async fn ensure_topic_embeddings(
    kb: &mut KnowledgeBase,
    provider: &dyn EmbeddingProvider,
) -> Result<usize> {
    let texts: Vec<String> = kb
        .topics()
        .filter(|(_, topic)| !topic.has_embedding())
        .map(|(_, topic)| topic.embedding_text())
        .collect();
    if texts.is_empty() {
        log::debug!("All knowledge base topics already embedded");
        return Ok(0);
    }

    log::info!(
        "Embedding {} knowledge base topics with {}",
        texts.len(),
        provider.model_id()
    );
    let vectors = embed_exact(provider, &texts).await?;

    let filled = vectors.len();
    let missing = kb.topics_mut().filter(|topic| !topic.has_embedding());
    for (topic, vector) in missing.zip(vectors) {
        topic.embedding = Some(vector);
    }
    Ok(filled)
}
