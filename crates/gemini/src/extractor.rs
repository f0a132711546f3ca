use crate::client::GeminiClient;
use crate::error::Result;
use crate::json::parse_graph_json;
use async_trait::async_trait;
use kgmatch_graph::KnowledgeGraph;
use std::sync::Arc;

/// Turns unstructured text (a caption, a description) into a knowledge graph
#[async_trait]
pub trait GraphExtractor: Send + Sync {
    fn name(&self) -> &str;

    async fn extract(&self, text: &str) -> Result<KnowledgeGraph>;
}

const EXTRACTION_INSTRUCTIONS: &str = "\
Task: analyse the text below and build a knowledge graph.
1. Extract the entities. For each entity give its name (id), its type (e.g. person, object, \
place, background) and the attributes the text mentions, as key/value pairs of strings.
2. Extract the relationships between entities. Both ends of a relationship must be entity ids.
3. Keep names, types, attribute keys and values in the language of the text.
Return only valid JSON with exactly this schema and no Markdown fences:
{\"entities\": [{\"id\": str, \"type\": str, \"attributes\": {str: str}}], \
\"relationships\": [{\"source\": str, \"target\": str, \"relation\": str}]}";

pub fn extraction_prompt(text: &str) -> String {
    format!("{EXTRACTION_INSTRUCTIONS}\n\nText:\n\"{}\"\n", text.trim())
}

pub struct GeminiExtractor {
    client: Arc<GeminiClient>,
    name: String,
}

impl GeminiExtractor {
    pub fn new(client: Arc<GeminiClient>) -> Self {
        let name = format!("gemini ({})", client.config().llm_model);
        Self { client, name }
    }
}

#[async_trait]
impl GraphExtractor for GeminiExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn extract(&self, text: &str) -> Result<KnowledgeGraph> {
        log::info!("Extracting knowledge graph with {}", self.name);
        let answer = self.client.generate_json(&extraction_prompt(text)).await?;
        let graph = parse_graph_json(&answer)?;
        let dangling = graph.dangling_relationships().count();
        if dangling > 0 {
            log::warn!(
                "Extracted graph has {} relationships with unknown endpoints",
                dangling
            );
        }
        log::info!(
            "Extracted {} entities, {} relationships",
            graph.entity_count(),
            graph.relationship_count()
        );
        Ok(graph)
    }
}
