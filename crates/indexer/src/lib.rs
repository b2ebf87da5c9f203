//! # ctxai Indexer
//!
//! Project indexing for semantic code search.
//!
//! ## Pipeline
//!
//! ```text
//! Directory
//!     │
//!     ├──> File Scanner (.gitignore aware, size guarded)
//!     │      └─> Source files
//!     │
//!     ├──> Chunker (grammar-aware, window fallback)
//!     │      └─> Code chunks
//!     │
//!     └──> Embed + Store (aligned batches)
//!            └─> Searchable index
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use ctxai_indexer::{Config, IndexPipeline};
//! use ctxai_embeddings::StubProvider;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load_or_init(".").await?;
//!     let provider = Arc::new(StubProvider::default());
//!     let pipeline = IndexPipeline::new(".", config, provider)?;
//!     let summary = pipeline.run("default").await?;
//!
//!     println!(
//!         "Indexed {} files, {} chunks",
//!         summary.files_indexed, summary.chunks_stored
//!     );
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod guard;
mod home;
mod pipeline;
mod scanner;
mod summary;

pub use config::{Config, IndexingConfig};
pub use error::{IndexerError, Result};
pub use guard::{ProjectStats, SizeCheck, SizeGuard};
pub use home::{config_path, ctxai_home, delete_index, index_dir};
pub use pipeline::{query_index, CancelToken, IndexPipeline, ProgressFn};
pub use scanner::{FileScanner, ScanConfig, ScanOutcome, ScannedFile};
pub use summary::{IndexSummary, Progress, Stage};
