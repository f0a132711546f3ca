use crate::client::GeminiClient;
use crate::error::GeminiError;
use crate::json::parse_graph_json;
use async_trait::async_trait;
use kgmatch_graph::KnowledgeGraph;
use kgmatch_pruning::{refinement_prompt, GraphRefiner, PruningError};
use std::sync::Arc;

/// `GraphRefiner` that sends the graph to the Gemini LLM for logical clean-up
pub struct GeminiRefiner {
    client: Arc<GeminiClient>,
    name: String,
}

impl GeminiRefiner {
    pub fn new(client: Arc<GeminiClient>) -> Self {
        let name = format!("gemini ({})", client.config().llm_model);
        Self { client, name }
    }
}

#[async_trait]
impl GraphRefiner for GeminiRefiner {
    fn name(&self) -> &str {
        &self.name
    }

    async fn refine(&self, graph: &KnowledgeGraph) -> kgmatch_pruning::Result<KnowledgeGraph> {
        let prompt = refinement_prompt(graph)?;
        let text = self
            .client
            .generate_json(&prompt)
            .await
            .map_err(|err| PruningError::Refinement(err.to_string()))?;
        parse_graph_json(&text).map_err(|err| match err {
            GeminiError::InvalidResponse(msg) => PruningError::InvalidResponse(msg),
            other => PruningError::Refinement(other.to_string()),
        })
    }
}
