//! # ctxai Code Chunker
//!
//! Structure-aware code chunking for semantic indexing.
//!
//! Source files are split along syntactic boundaries (functions, classes,
//! methods) using Tree-sitter where a grammar is available, and into
//! fixed-size overlapping text windows everywhere else. Every chunk is an
//! exact slice of the original file with accurate 1-based line numbers, so
//! search results can point straight back into the source.
//!
//! ```text
//! Source File
//!     │
//!     ├──> Language Detection (from extension)
//!     │
//!     ├──> Tree-sitter Parsing → definitions, imports, gaps
//!     │         │ (no grammar / parse failure)
//!     │         └──> Fixed-size text windows with overlap
//!     │
//!     └──> Chunk[] sorted by start line
//! ```
//!
//! ## Example
//!
//! ```rust
//! use ctxai_code_chunker::{Chunker, ChunkerConfig};
//!
//! let chunker = Chunker::new(ChunkerConfig::default()).unwrap();
//!
//! let code = "fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n";
//! let chunks = chunker.chunk_str(code, "example.rs").unwrap();
//! for chunk in chunks {
//!     println!("{} lines {}-{}", chunk.kind.as_str(), chunk.start_line, chunk.end_line);
//! }
//! ```

mod ast;
mod chunker;
mod config;
mod error;
mod language;
mod types;
mod window;

pub use chunker::Chunker;
pub use config::ChunkerConfig;
pub use error::{ChunkerError, Result};
pub use language::Language;
pub use types::{Chunk, ChunkKind};
