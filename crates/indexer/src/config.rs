use crate::error::Result;
use crate::home;
use ctxai_embeddings::ProviderConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Full configuration snapshot.
///
/// Loaded once from `.ctxai/config.json` and passed into the pipeline;
/// a running index never sees configuration changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub embedding: ProviderConfig,

    #[serde(default)]
    pub indexing: IndexingConfig,
}

/// Traversal, chunking and batching knobs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexingConfig {
    /// Target chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between fallback text windows, in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Chunks per embedding/storage batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Hard limit on the number of files in a project
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Hard limit on total project size
    #[serde(default = "default_max_total_size_mb")]
    pub max_total_size_mb: u64,

    /// Files larger than this are skipped, not indexed
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,

    /// Glob patterns a file must match to be indexed (empty = all)
    #[serde(default)]
    pub include: Vec<String>,

    /// Glob patterns that always exclude a file
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Honor .gitignore files during traversal
    #[serde(default = "default_true")]
    pub follow_ignore_file: bool,
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    100
}
fn default_batch_size() -> usize {
    100
}
fn default_max_files() -> usize {
    10_000
}
fn default_max_total_size_mb() -> u64 {
    500
}
fn default_max_file_size_mb() -> u64 {
    5
}
fn default_true() -> bool {
    true
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            batch_size: default_batch_size(),
            max_files: default_max_files(),
            max_total_size_mb: default_max_total_size_mb(),
            max_file_size_mb: default_max_file_size_mb(),
            include: Vec::new(),
            exclude: Vec::new(),
            follow_ignore_file: true,
        }
    }
}

impl IndexingConfig {
    pub const fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }

    pub const fn max_total_size_bytes(&self) -> u64 {
        self.max_total_size_mb * 1024 * 1024
    }
}

impl Config {
    /// Load the config for a project, writing defaults on first use
    pub async fn load_or_init(project_root: impl AsRef<Path>) -> Result<Self> {
        let path = home::config_path(project_root.as_ref());
        if path.exists() {
            let data = tokio::fs::read_to_string(&path).await?;
            Ok(serde_json::from_str(&data)?)
        } else {
            let config = Self::default();
            config.save(project_root).await?;
            Ok(config)
        }
    }

    /// Write the config to `.ctxai/config.json`
    pub async fn save(&self, project_root: impl AsRef<Path>) -> Result<()> {
        let path = home::config_path(project_root.as_ref());
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, data).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_documented_limits() {
        let config = IndexingConfig::default();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 100);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.max_files, 10_000);
        assert_eq!(config.max_total_size_mb, 500);
        assert_eq!(config.max_file_size_mb, 5);
        assert!(config.follow_ignore_file);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"indexing": {"max_files": 42}}"#).unwrap();
        assert_eq!(config.indexing.max_files, 42);
        assert_eq!(config.indexing.chunk_size, 1000);
    }

    #[tokio::test]
    async fn load_or_init_writes_defaults_once() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_or_init(temp.path()).await.unwrap();
        assert_eq!(config, Config::default());

        let path = home::config_path(temp.path());
        assert!(path.exists());

        // Edit and reload.
        let mut edited = config.clone();
        edited.indexing.max_files = 7;
        edited.save(temp.path()).await.unwrap();
        let reloaded = Config::load_or_init(temp.path()).await.unwrap();
        assert_eq!(reloaded.indexing.max_files, 7);
    }
}
