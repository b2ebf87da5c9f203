//! # ctxai Vector Store
//!
//! Durable vector storage and similarity search for code chunks.
//!
//! One named index maps to one store directory holding a JSON snapshot
//! (`index.json` + `meta.json`). Records are keyed by the chunk's
//! `source_path:start_line:end_line`, which makes upserts idempotent:
//! re-indexing an unchanged project rewrites records in place.
//!
//! Queries are a brute-force cosine scan, ascending by distance with
//! ties broken by record id. Collections sized for a single project do
//! not need an ANN structure.

mod error;
mod store;
mod types;

pub use error::{Result, VectorStoreError};
pub use store::{cosine_distance, VectorStore};
pub use types::{IndexRecord, SearchResult, StoreMeta, StoreStats};
