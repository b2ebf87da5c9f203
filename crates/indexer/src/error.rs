use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Chunker error: {0}")]
    ChunkerError(#[from] ctxai_code_chunker::ChunkerError),

    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] ctxai_vector_store::VectorStoreError),

    #[error("Embedding provider error: {0}")]
    EmbeddingError(#[from] ctxai_embeddings::EmbeddingError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Project too large: {0}")]
    ProjectTooLarge(String),

    #[error("Invalid project path: {0}")]
    InvalidPath(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}
