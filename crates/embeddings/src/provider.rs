use crate::error::{EmbeddingError, Result};
use async_trait::async_trait;

/// Trait for embedding providers
///
/// Allows abstraction over different embedding backends (local models,
/// OpenAI-compatible APIs, Hugging Face inference).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a batch of texts.
    ///
    /// The output has exactly one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the fixed embedding dimension
    fn dimension(&self) -> usize;

    /// Largest batch this provider accepts in one call
    fn max_batch_size(&self) -> usize;

    /// Identifier of the underlying model
    fn model_id(&self) -> &str;
}

/// Validate a batch before dispatching it to a backend.
///
/// Rejects empty strings and oversized batches; both are caller bugs
/// rather than transient conditions.
pub(crate) fn check_batch(texts: &[String], max_batch_size: usize) -> Result<()> {
    if texts.len() > max_batch_size {
        return Err(EmbeddingError::invalid_input(format!(
            "batch of {} exceeds provider maximum {}",
            texts.len(),
            max_batch_size
        )));
    }
    if let Some(idx) = texts.iter().position(|t| t.is_empty()) {
        return Err(EmbeddingError::invalid_input(format!(
            "empty text at batch position {idx}"
        )));
    }
    Ok(())
}

/// Enforce positional correspondence between inputs and outputs
pub(crate) fn check_count(expected: usize, vectors: &[Vec<f32>]) -> Result<()> {
    if vectors.len() != expected {
        return Err(EmbeddingError::CountMismatch {
            expected,
            actual: vectors.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_oversized_batches() {
        let texts = vec!["a".to_string(); 5];
        assert!(check_batch(&texts, 4).is_err());
        assert!(check_batch(&texts, 5).is_ok());
    }

    #[test]
    fn rejects_empty_strings() {
        let texts = vec!["a".to_string(), String::new()];
        let err = check_batch(&texts, 10).unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidInput(_)));
    }

    #[test]
    fn detects_count_mismatch() {
        let vectors = vec![vec![0.0; 3]; 2];
        assert!(check_count(2, &vectors).is_ok());
        assert!(matches!(
            check_count(3, &vectors),
            Err(EmbeddingError::CountMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }
}
