use crate::error::{EmbeddingError, Result};
use crate::provider::{check_batch, check_count, EmbeddingProvider};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Arc;

/// Local in-process embedding provider backed by FastEmbed.
///
/// Models are downloaded to the local cache on first use. Any failure
/// here is fatal for the run: if one batch cannot be embedded, none can.
pub struct LocalProvider {
    model: Arc<TextEmbedding>,
    model_id: String,
    dimension: usize,
}

impl LocalProvider {
    /// Create a provider for a named model.
    ///
    /// Supported: all-MiniLM-L6-v2 (384D), bge-small-en-v1.5 (384D),
    /// bge-base-en-v1.5 (768D).
    pub fn new(model_id: &str) -> Result<Self> {
        let (embedding_model, dimension) = match model_id {
            "all-MiniLM-L6-v2" | "all-minilm-l6-v2" => (EmbeddingModel::AllMiniLML6V2, 384),
            "bge-small-en-v1.5" => (EmbeddingModel::BGESmallENV15, 384),
            "bge-base-en-v1.5" => (EmbeddingModel::BGEBaseENV15, 768),
            other => {
                return Err(EmbeddingError::invalid_config(format!(
                    "unsupported local model: {other}. Supported: \
                     all-MiniLM-L6-v2, bge-small-en-v1.5, bge-base-en-v1.5"
                )));
            }
        };

        log::info!("Initializing local embedding model {model_id} ({dimension}D)");

        let init_options = InitOptions::new(embedding_model).with_show_download_progress(true);
        let model = TextEmbedding::try_new(init_options)
            .map_err(|e| EmbeddingError::fatal(format!("model initialization failed: {e}")))?;

        Ok(Self {
            model: Arc::new(model),
            model_id: model_id.to_string(),
            dimension,
        })
    }

    /// Create provider with the default model (all-MiniLM-L6-v2)
    pub fn with_default_model() -> Result<Self> {
        Self::new("all-MiniLM-L6-v2")
    }
}

#[async_trait]
impl EmbeddingProvider for LocalProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        check_batch(texts, self.max_batch_size())?;
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let owned: Vec<String> = texts.to_vec();
        // ONNX inference is CPU-bound; keep it off the async executor.
        let vectors = tokio::task::spawn_blocking(move || model.embed(owned, None))
            .await
            .map_err(|e| EmbeddingError::fatal(format!("embedding task panicked: {e}")))?
            .map_err(|e| EmbeddingError::fatal(format!("embedding generation failed: {e}")))?;

        check_count(texts.len(), &vectors)?;
        for vector in &vectors {
            if vector.len() != self.dimension {
                return Err(EmbeddingError::fatal(format!(
                    "model produced {}D vector, expected {}D",
                    vector.len(),
                    self.dimension
                )));
            }
        }

        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn max_batch_size(&self) -> usize {
        256
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
