use ctxai_code_chunker::Chunk;
use serde::{Deserialize, Serialize};

/// One stored chunk with its embedding vector.
///
/// The id is derived from the chunk's location
/// (`source_path:start_line:end_line`), so re-indexing an unchanged file
/// writes over the old record instead of adding a duplicate. The index
/// name completes the key; records from different indexes never share a
/// store directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexRecord {
    pub id: String,
    pub index_name: String,
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

impl IndexRecord {
    pub fn new(index_name: impl Into<String>, chunk: Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: chunk.stable_id(),
            index_name: index_name.into(),
            chunk,
            vector,
        }
    }
}

/// A query hit with its cosine distance (smaller is closer)
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub distance: f32,
    pub id: String,
}

/// Durable metadata for one named index
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreMeta {
    /// Model that produced the stored vectors
    pub model_id: Option<String>,

    /// Vector dimension, established by the first upsert
    pub dimension: Option<usize>,
}

/// Summary counters over a store's contents
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreStats {
    pub total_records: usize,
    pub unique_files: usize,
    pub languages: std::collections::BTreeMap<String, usize>,
}
