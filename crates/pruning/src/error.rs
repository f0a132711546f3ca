use thiserror::Error;

pub type Result<T> = std::result::Result<T, PruningError>;

#[derive(Error, Debug)]
pub enum PruningError {
    #[error("Graph error: {0}")]
    Graph(#[from] kgmatch_graph::GraphError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] kgmatch_embeddings::EmbeddingError),

    #[error("Refinement service error: {0}")]
    Refinement(String),

    #[error("Invalid refinement response: {0}")]
    InvalidResponse(String),
}
