//! # kgmatch embeddings
//!
//! The embedding seam shared by the pruning and matching engines.
//!
//! - [`EmbeddingProvider`] - batch text -> vector capability implemented by real services
//! - [`StubEmbedder`] - deterministic offline backend for tests and dry runs
//! - [`cosine_similarity`] - the similarity measure every stage uses

mod error;
mod provider;
mod similarity;
mod stub;

pub use error::{EmbeddingError, Result};
pub use provider::{embed_exact, EmbeddingProvider};
pub use similarity::{cosine_similarity, normalize};
pub use stub::{StubEmbedder, STUB_MODEL_ID};
