use thiserror::Error;

/// Result type for embedding operations
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur while producing embeddings
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// The provider cannot continue; the whole run should stop.
    /// Local model failures land here: if one batch fails, they all will.
    #[error("Embedding provider failed fatally: {0}")]
    Fatal(String),

    /// One batch failed after retries; other batches may still succeed
    #[error("Embedding batch failed: {0}")]
    BatchFailed(String),

    /// Caller handed the provider something it cannot embed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Provider returned a different number of vectors than inputs
    #[error("Provider returned {actual} embeddings for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },

    /// Provider configuration is unusable
    #[error("Invalid provider configuration: {0}")]
    InvalidConfig(String),
}

impl EmbeddingError {
    /// Create a fatal error
    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    /// Create a batch failure
    pub fn batch_failed(msg: impl Into<String>) -> Self {
        Self::BatchFailed(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether this error should abort the whole indexing run
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_) | Self::InvalidConfig(_))
    }
}
