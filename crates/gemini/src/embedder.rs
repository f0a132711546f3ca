use crate::client::GeminiClient;
use async_trait::async_trait;
use kgmatch_embeddings::{EmbeddingError, EmbeddingProvider};
use std::sync::Arc;

/// `EmbeddingProvider` backed by `batchEmbedContents`
pub struct GeminiEmbedder {
    client: Arc<GeminiClient>,
}

impl GeminiEmbedder {
    pub fn new(client: Arc<GeminiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    fn model_id(&self) -> &str {
        &self.client.config().embedding_model
    }

    async fn embed_batch(&self, texts: &[String]) -> kgmatch_embeddings::Result<Vec<Vec<f32>>> {
        self.client
            .batch_embed(texts)
            .await
            .map_err(|err| EmbeddingError::Provider(err.to_string()))
    }
}
