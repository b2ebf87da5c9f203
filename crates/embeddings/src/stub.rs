use crate::error::Result;
use crate::provider::{check_batch, EmbeddingProvider};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Deterministic offline embedding backend.
///
/// Vectors are derived from a hash of the text, so equal inputs always
/// produce equal vectors. Useful for tests and smoke runs where model
/// downloads or API keys are unavailable; the geometry is meaningless.
pub struct StubProvider {
    dimension: usize,
}

impl StubProvider {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Hash-derived unit-norm vector for one text
    fn stub_embed(&self, text: &str) -> Vec<f32> {
        let mut vector = Vec::with_capacity(self.dimension);
        let mut counter = 0u32;
        while vector.len() < self.dimension {
            let mut hasher = Sha256::new();
            hasher.update(text.as_bytes());
            hasher.update(counter.to_le_bytes());
            let digest = hasher.finalize();
            for bytes in digest.chunks_exact(4) {
                if vector.len() == self.dimension {
                    break;
                }
                let raw = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                // Map to [-1, 1].
                vector.push((raw as f32 / u32::MAX as f32) * 2.0 - 1.0);
            }
            counter += 1;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl EmbeddingProvider for StubProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        check_batch(texts, self.max_batch_size())?;
        Ok(texts.iter().map(|t| self.stub_embed(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn max_batch_size(&self) -> usize {
        1024
    }

    fn model_id(&self) -> &str {
        "stub"
    }
}
