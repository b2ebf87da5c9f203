use serde::{Deserialize, Serialize};

/// A chunk of source code with its exact location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Source file path, relative to the project root
    pub source_path: String,

    /// Start line (1-indexed)
    pub start_line: usize,

    /// End line (1-indexed, inclusive)
    pub end_line: usize,

    /// Exact slice of the original file contents. Definition chunks end
    /// at the definition's final token, so a line break after it stays
    /// outside the chunk.
    pub content: String,

    /// Detected language name (e.g. "rust", "python")
    pub language: String,

    /// What kind of construct this chunk covers
    pub kind: ChunkKind,

    /// Symbol name for definition chunks ("parse", "Config::load")
    pub symbol_name: Option<String>,
}

impl Chunk {
    /// Get the number of lines in this chunk
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    /// Check if chunk contains a specific line
    #[must_use]
    pub const fn contains_line(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }

    /// Stable identifier used to key this chunk in a vector index.
    ///
    /// Re-chunking an unchanged file reproduces the same ids, so a
    /// re-index overwrites records instead of duplicating them.
    #[must_use]
    pub fn stable_id(&self) -> String {
        format!("{}:{}:{}", self.source_path, self.start_line, self.end_line)
    }
}

/// Kind of construct a chunk covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    /// Standalone function
    Function,
    /// Class, struct, enum or trait definition
    Class,
    /// Method inside a class or impl block
    Method,
    /// Module-level code between definitions
    Module,
    /// Run of import/use statements
    ImportBlock,
    /// Fixed-size text window (fallback path)
    TextWindow,
}

impl ChunkKind {
    /// Whether this chunk came out of the structural path
    #[must_use]
    pub const fn is_structural(self) -> bool {
        !matches!(self, Self::TextWindow)
    }

    /// Get human-readable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Method => "method",
            Self::Module => "module",
            Self::ImportBlock => "import_block",
            Self::TextWindow => "text_window",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chunk(start: usize, end: usize) -> Chunk {
        Chunk {
            source_path: "src/lib.rs".to_string(),
            start_line: start,
            end_line: end,
            content: "code".to_string(),
            language: "rust".to_string(),
            kind: ChunkKind::Function,
            symbol_name: Some("f".to_string()),
        }
    }

    #[test]
    fn test_line_count() {
        assert_eq!(chunk(10, 15).line_count(), 6);
        assert_eq!(chunk(3, 3).line_count(), 1);
    }

    #[test]
    fn test_contains_line() {
        let c = chunk(10, 15);
        assert!(c.contains_line(10));
        assert!(c.contains_line(15));
        assert!(!c.contains_line(9));
        assert!(!c.contains_line(16));
    }

    #[test]
    fn test_stable_id_is_deterministic() {
        assert_eq!(chunk(10, 15).stable_id(), "src/lib.rs:10:15");
        assert_eq!(chunk(10, 15).stable_id(), chunk(10, 15).stable_id());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ChunkKind::Function.as_str(), "function");
        assert_eq!(ChunkKind::ImportBlock.as_str(), "import_block");
        assert!(ChunkKind::Method.is_structural());
        assert!(!ChunkKind::TextWindow.is_structural());
    }
}
