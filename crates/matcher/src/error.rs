use thiserror::Error;

pub type Result<T> = std::result::Result<T, MatchError>;

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Embedding error: {0}")]
    Embedding(#[from] kgmatch_embeddings::EmbeddingError),

    #[error("Graph error: {0}")]
    Graph(#[from] kgmatch_graph::GraphError),
}
