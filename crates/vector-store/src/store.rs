use crate::error::{Result, VectorStoreError};
use crate::types::{IndexRecord, SearchResult, StoreMeta, StoreStats};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

const INDEX_FILE: &str = "index.json";
const META_FILE: &str = "meta.json";

/// Persistent vector store for one named index.
///
/// Records live in memory keyed by their stable chunk id; `save` writes
/// a JSON snapshot of the whole collection into the store directory.
pub struct VectorStore {
    records: HashMap<String, IndexRecord>,
    meta: StoreMeta,
    dir: PathBuf,
}

impl VectorStore {
    /// Open a store directory, loading the snapshot when one exists
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let index_path = dir.join(INDEX_FILE);

        if index_path.exists() {
            log::info!("Loading vector store from {}", dir.display());
            let data = tokio::fs::read_to_string(&index_path).await?;
            let records: HashMap<String, IndexRecord> = serde_json::from_str(&data)?;

            let meta_data = tokio::fs::read_to_string(dir.join(META_FILE)).await?;
            let meta: StoreMeta = serde_json::from_str(&meta_data)?;

            log::info!("Loaded {} records", records.len());
            Ok(Self { records, meta, dir })
        } else {
            Ok(Self {
                records: HashMap::new(),
                meta: StoreMeta::default(),
                dir,
            })
        }
    }

    /// Verify the store accepts vectors from this model before indexing.
    ///
    /// A fresh store adopts the model; a populated one rejects a change
    /// of model or dimension without touching any records.
    pub fn check_model(&mut self, model_id: &str, dimension: usize) -> Result<()> {
        if let Some(expected) = self.meta.dimension {
            if expected != dimension {
                return Err(VectorStoreError::DimensionMismatch {
                    expected,
                    actual: dimension,
                });
            }
        }
        if let Some(stored) = &self.meta.model_id {
            if stored != model_id {
                return Err(VectorStoreError::ModelMismatch {
                    stored: stored.clone(),
                    requested: model_id.to_string(),
                });
            }
        }

        self.meta.model_id = Some(model_id.to_string());
        self.meta.dimension = Some(dimension);
        Ok(())
    }

    /// Insert or overwrite a batch of records.
    ///
    /// Every vector is validated against the established dimension
    /// before anything is written; a mismatch anywhere in the batch
    /// leaves the store untouched.
    pub fn upsert(&mut self, records: Vec<IndexRecord>) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let dimension = match self.meta.dimension {
            Some(d) => d,
            None => {
                let d = records[0].vector.len();
                self.meta.dimension = Some(d);
                d
            }
        };

        for record in &records {
            if record.vector.len() != dimension {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: dimension,
                    actual: record.vector.len(),
                });
            }
        }

        let count = records.len();
        for record in records {
            self.records.insert(record.id.clone(), record);
        }
        log::debug!("Upserted {count} records, total {}", self.records.len());
        Ok(count)
    }

    /// Drop all records for one source file.
    ///
    /// Used before re-indexing a file whose chunk boundaries moved, so
    /// stale spans do not linger next to the fresh ones.
    pub fn remove_file(&mut self, source_path: &str) -> usize {
        let before = self.records.len();
        self.records
            .retain(|_, record| record.chunk.source_path != source_path);
        before - self.records.len()
    }

    /// Drop records for one source file whose ids are not in the fresh
    /// set.
    ///
    /// Lets a re-index replace a file's records only after all of its
    /// replacements have landed; an empty fresh set clears the file.
    pub fn remove_stale(&mut self, source_path: &str, fresh_ids: &HashSet<String>) -> usize {
        let before = self.records.len();
        self.records.retain(|id, record| {
            record.chunk.source_path != source_path || fresh_ids.contains(id)
        });
        before - self.records.len()
    }

    /// Nearest records by cosine distance, ascending.
    ///
    /// Ties are broken by record id so results are reproducible.
    pub fn query(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        if let Some(expected) = self.meta.dimension {
            if query_vector.len() != expected {
                return Err(VectorStoreError::DimensionMismatch {
                    expected,
                    actual: query_vector.len(),
                });
            }
        }

        let mut scored: Vec<(&IndexRecord, f32)> = self
            .records
            .values()
            .map(|record| (record, cosine_distance(query_vector, &record.vector)))
            .collect();

        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.id.cmp(&b.0.id))
        });
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(record, distance)| SearchResult {
                chunk: record.chunk.clone(),
                distance,
                id: record.id.clone(),
            })
            .collect())
    }

    /// Get record by id
    pub fn get(&self, id: &str) -> Option<&IndexRecord> {
        self.records.get(id)
    }

    /// Get total number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if store is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Store metadata (model, dimension)
    pub fn meta(&self) -> &StoreMeta {
        &self.meta
    }

    /// Counters over the stored records
    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats {
            total_records: self.records.len(),
            ..Default::default()
        };
        let mut files = std::collections::BTreeSet::new();
        for record in self.records.values() {
            files.insert(record.chunk.source_path.as_str());
            *stats
                .languages
                .entry(record.chunk.language.clone())
                .or_insert(0) += 1;
        }
        stats.unique_files = files.len();
        stats
    }

    /// Save a snapshot to disk.
    ///
    /// Writes to temp files and renames them into place so a crash
    /// mid-save never leaves a torn snapshot behind.
    pub async fn save(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let index_data = serde_json::to_string(&self.records)?;
        let meta_data = serde_json::to_string_pretty(&self.meta)?;

        write_atomic(&self.dir.join(INDEX_FILE), index_data.as_bytes()).await?;
        write_atomic(&self.dir.join(META_FILE), meta_data.as_bytes()).await?;

        log::info!(
            "Saved {} records to {}",
            self.records.len(),
            self.dir.display()
        );
        Ok(())
    }
}

async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, data).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Cosine distance in [0, 2]; identical directions give 0.
///
/// A zero vector has no direction, so its distance to anything is 1.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}
