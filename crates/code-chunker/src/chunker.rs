use crate::ast::AstChunker;
use crate::config::ChunkerConfig;
use crate::error::Result;
use crate::language::Language;
use crate::types::{Chunk, ChunkKind};
use crate::window;
use std::path::Path;

/// Main chunker interface for processing code
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Create a new chunker with a validated configuration
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Chunk code from a string.
    ///
    /// Empty content yields no chunks. Content shorter than the chunk
    /// size yields exactly one.
    pub fn chunk_str(&self, content: &str, source_path: &str) -> Result<Vec<Chunk>> {
        let language = Language::from_path(source_path);
        self.chunk_with_language(content, source_path, language)
    }

    /// Chunk code from a file on disk
    pub fn chunk_file(&self, path: impl AsRef<Path>, source_path: &str) -> Result<Vec<Chunk>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        self.chunk_str(&content, source_path)
    }

    /// Chunk code with an explicit language
    pub fn chunk_with_language(
        &self,
        content: &str,
        source_path: &str,
        language: Language,
    ) -> Result<Vec<Chunk>> {
        if content.is_empty() {
            return Ok(Vec::new());
        }

        if language.supports_ast() {
            match self.chunk_with_ast(content, source_path, language) {
                Ok(chunks) if !chunks.is_empty() => {
                    return Ok(Self::sort_chunks(chunks));
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!(
                        "Structural chunking failed for {source_path}, \
                         falling back to text windows: {e}"
                    );
                }
            }
        }

        Ok(Self::sort_chunks(self.chunk_windows(
            content,
            source_path,
            language,
        )))
    }

    /// Whether a file of this language will take the fallback path
    #[must_use]
    pub fn uses_fallback(&self, source_path: &str) -> bool {
        !Language::from_path(source_path).supports_ast()
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    fn chunk_with_ast(
        &self,
        content: &str,
        source_path: &str,
        language: Language,
    ) -> Result<Vec<Chunk>> {
        let mut analyzer = AstChunker::new(self.config.clone(), language)?;
        analyzer.chunk(content, source_path)
    }

    /// Fallback: fixed-size overlapping character windows
    fn chunk_windows(&self, content: &str, source_path: &str, language: Language) -> Vec<Chunk> {
        window::window_spans(content, self.config.chunk_size, self.config.window_step())
            .into_iter()
            .map(|(start, end)| {
                let slice = &content[start..end];
                let start_line = 1 + count_newlines(&content[..start]);
                let mut end_line = 1 + count_newlines(&content[..end]);
                if slice.ends_with('\n') && end_line > start_line {
                    end_line -= 1;
                }
                Chunk {
                    source_path: source_path.to_string(),
                    start_line,
                    end_line,
                    content: slice.to_string(),
                    language: language.as_str().to_string(),
                    kind: ChunkKind::TextWindow,
                    symbol_name: None,
                }
            })
            .collect()
    }

    fn sort_chunks(mut chunks: Vec<Chunk>) -> Vec<Chunk> {
        chunks.sort_by(|a, b| {
            a.start_line
                .cmp(&b.start_line)
                .then_with(|| a.end_line.cmp(&b.end_line))
        });
        chunks
    }
}

fn count_newlines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}
