use crate::error::{EmbeddingError, Result};
use async_trait::async_trait;

/// Batch text -> vector capability.
///
/// Implementations return exactly one fixed-dimensionality vector per input text, in input
/// order, or an error. Callers issue one call per logical batch.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Identifier of the underlying model (for logs)
    fn model_id(&self) -> &str;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed `texts` and verify the provider honoured the one-vector-per-text contract.
///
/// An empty batch never reaches the provider.
pub async fn embed_exact(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    log::debug!(
        "Embedding batch of {} texts with {}",
        texts.len(),
        provider.model_id()
    );
    let vectors = provider.embed_batch(texts).await?;
    if vectors.len() != texts.len() {
        return Err(EmbeddingError::CountMismatch {
            expected: texts.len(),
            actual: vectors.len(),
        });
    }

    if let Some(first) = vectors.first() {
        let dimension = first.len();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(EmbeddingError::InvalidDimension {
                expected: dimension,
                actual: bad.len(),
            });
        }
    }

    Ok(vectors)
}
