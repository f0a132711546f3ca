use crate::error::Result;
use crate::provider::EmbeddingProvider;
use crate::similarity::normalize;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const STUB_MODEL_ID: &str = "stub";

/// Deterministic, offline embedding backend.
///
/// Each text is hashed into a seed that drives a splitmix64 stream, giving a unit vector that
/// is stable across runs and platforms. Identical texts embed identically; distinct texts are
/// nearly orthogonal in practice. Intended for tests and runs without network access.
#[derive(Debug)]
pub struct StubEmbedder {
    dimension: usize,
    batch_calls: AtomicUsize,
}

impl StubEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            batch_calls: AtomicUsize::new(0),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of `embed_batch` calls served so far
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::Relaxed)
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        stub_embed(text, self.dimension)
    }
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    fn model_id(&self) -> &str {
        STUB_MODEL_ID
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::Relaxed);
        Ok(texts
            .iter()
            .map(|text| stub_embed(text, self.dimension))
            .collect())
    }
}

fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let high = (bits >> 32) as u32;
        let mantissa = high >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    normalize(&mut vec);
    vec
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::cosine_similarity;

    #[tokio::test]
    async fn stub_is_deterministic_and_unit_length() {
        let embedder = StubEmbedder::new(32);
        let texts = vec!["颜色: 白色".to_string(), "颜色: 白色".to_string()];
        let vectors = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vectors[1]);
        assert_eq!(vectors[0].len(), 32);
        let norm: f32 = vectors[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert_eq!(embedder.batch_calls(), 1);
    }

    #[test]
    fn distinct_texts_are_not_near_duplicates() {
        let embedder = StubEmbedder::new(64);
        let a = embedder.embed_one("状态: 开发中");
        let b = embedder.embed_one("颜色: 白色");
        assert!(cosine_similarity(&a, &b) < 0.9);
    }
}
