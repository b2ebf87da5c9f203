use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for code chunking behavior
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkerConfig {
    /// Target chunk size in characters. Structural chunks larger than
    /// this get subdivided; fallback windows are exactly this long
    /// (except the last one).
    pub chunk_size: usize,

    /// Overlap between consecutive fallback windows, in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
        }
    }
}

impl ChunkerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ChunkerError::invalid_config("chunk_size must be > 0"));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(ChunkerError::invalid_config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }

        Ok(())
    }

    /// Step between window starts on the fallback path
    #[must_use]
    pub const fn window_step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}
