use serde::{Deserialize, Serialize};

/// Pipeline stage, reported through progress events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    Traverse,
    SizeCheck,
    Chunk,
    Embed,
    Store,
    Done,
    Failed,
}

impl Stage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Traverse => "traverse",
            Self::SizeCheck => "size_check",
            Self::Chunk => "chunk",
            Self::Embed => "embed",
            Self::Store => "store",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

/// One progress event; rendering belongs to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub stage: Stage,
    pub current: usize,
    pub total: usize,
}

/// What an indexing run accomplished
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IndexSummary {
    /// Files whose chunks made it into the pipeline
    pub files_indexed: usize,

    /// Files skipped as binary during traversal
    pub files_skipped_binary: usize,

    /// Files skipped for exceeding the per-file size limit
    pub files_skipped_oversized: usize,

    /// Files chunked via text windows instead of their grammar.
    ///
    /// Counts only files whose language has a grammar; languages
    /// without one always take the window path and are not counted.
    pub fallback_files: usize,

    pub chunks_produced: usize,
    pub chunks_embedded: usize,
    pub chunks_stored: usize,

    /// Chunks lost to failed embed or store batches
    pub chunks_failed: usize,

    /// Non-fatal problems collected along the way
    pub warnings: Vec<String>,

    /// True when the run stopped at a cancellation point
    pub cancelled: bool,

    pub duration_ms: u64,
}

impl IndexSummary {
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}
