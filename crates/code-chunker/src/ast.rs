use crate::config::ChunkerConfig;
use crate::error::{ChunkerError, Result};
use crate::language::Language;
use crate::types::{Chunk, ChunkKind};
use crate::window;
use tree_sitter::{Node, Parser};

/// Structural chunker backed by Tree-sitter.
///
/// Walks top-level definitions, subdivides containers that exceed the
/// configured chunk size, and covers inter-definition text with module
/// chunks so the whole file ends up represented.
pub struct AstChunker {
    config: ChunkerConfig,
    parser: Parser,
    language: Language,
}

/// Byte span of the original file destined to become one chunk
#[derive(Debug, Clone)]
struct Span {
    start_byte: usize,
    end_byte: usize,
    kind: ChunkKind,
    symbol: Option<String>,
}

impl AstChunker {
    /// Create a structural chunker for a language with a registered grammar
    pub fn new(config: ChunkerConfig, language: Language) -> Result<Self> {
        if !language.supports_ast() {
            return Err(ChunkerError::unsupported_language(language.as_str()));
        }

        let ts_language = language.tree_sitter_language()?;
        let mut parser = Parser::new();
        parser
            .set_language(&ts_language)
            .map_err(|e| ChunkerError::tree_sitter(format!("Failed to set language: {e}")))?;

        Ok(Self {
            config,
            parser,
            language,
        })
    }

    /// Parse and chunk a file's contents.
    ///
    /// A tree with ERROR nodes is still used for whatever definitions it
    /// recovered; the regions around them fall through to gap coverage.
    pub fn chunk(&mut self, content: &str, source_path: &str) -> Result<Vec<Chunk>> {
        let tree = self
            .parser
            .parse(content, None)
            .ok_or_else(|| ChunkerError::parse("parser produced no tree"))?;

        let root = tree.root_node();
        if root.has_error() {
            log::debug!(
                "Partial parse for {source_path}, keeping recovered definitions"
            );
        }

        let mut spans = Vec::new();
        self.collect_spans(content, root, &mut spans);
        spans.sort_by_key(|s| (s.start_byte, s.end_byte));

        let spans = self.cover_gaps(content, spans);
        let spans = self.merge_small(content, spans);

        Ok(spans
            .into_iter()
            .map(|s| self.materialize(content, source_path, &s))
            .collect())
    }

    /// Collect definition and import spans from the children of `node`
    fn collect_spans(&self, content: &str, node: Node, spans: &mut Vec<Span>) {
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();

        for child in children {
            match self.classify(child) {
                Classified::Definition(kind) => {
                    self.emit_definition(content, child, kind, None, spans);
                }
                Classified::Import => spans.push(Span {
                    start_byte: child.start_byte(),
                    end_byte: child.end_byte(),
                    kind: ChunkKind::ImportBlock,
                    symbol: None,
                }),
                Classified::Wrapper => {
                    // export_statement / decorated_definition: classify by
                    // the wrapped declaration, keep the wrapper's span.
                    if let Some(inner_kind) = self.wrapped_definition_kind(child) {
                        self.emit_definition(content, child, inner_kind, None, spans);
                    }
                }
                Classified::Other => {}
            }
        }
    }

    /// Emit a definition span, subdividing when it exceeds the chunk size
    fn emit_definition(
        &self,
        content: &str,
        node: Node,
        kind: ChunkKind,
        parent: Option<&str>,
        spans: &mut Vec<Span>,
    ) {
        let slice = &content[node.start_byte()..node.end_byte()];
        let symbol = self.qualified_symbol(content, node, parent);

        if slice.chars().count() <= self.config.chunk_size {
            spans.push(Span {
                start_byte: node.start_byte(),
                end_byte: node.end_byte(),
                kind,
                symbol,
            });
            return;
        }

        // Too big for one chunk: descend into member definitions when the
        // node has a body that carries them, otherwise window it in place.
        if self.subdivide_container(content, node, spans) {
            return;
        }

        for (start, end) in window::window_spans(
            slice,
            self.config.chunk_size,
            self.config.window_step(),
        ) {
            spans.push(Span {
                start_byte: node.start_byte() + start,
                end_byte: node.start_byte() + end,
                kind: ChunkKind::TextWindow,
                symbol: symbol.clone(),
            });
        }
    }

    /// Break a container (impl block, class, module) into member chunks.
    ///
    /// Returns false when the node has no member definitions to descend
    /// into; the caller falls back to windowing.
    fn subdivide_container(&self, content: &str, node: Node, spans: &mut Vec<Span>) -> bool {
        let body_kinds: &[&str] = match self.language {
            Language::Rust => &["declaration_list"],
            Language::Python => &["block"],
            Language::JavaScript | Language::TypeScript => &["class_body", "statement_block"],
            _ => return false,
        };

        let container_name = extract_symbol_name(content, node);
        let mut found = false;

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if !body_kinds.contains(&child.kind()) {
                continue;
            }

            let mut body_cursor = child.walk();
            for member in child.children(&mut body_cursor) {
                let member_kind = match self.classify(member) {
                    Classified::Definition(ChunkKind::Function) => ChunkKind::Method,
                    Classified::Definition(k) => k,
                    Classified::Wrapper => match self.wrapped_definition_kind(member) {
                        Some(ChunkKind::Function) => ChunkKind::Method,
                        Some(k) => k,
                        None => continue,
                    },
                    _ => continue,
                };
                self.emit_definition(
                    content,
                    member,
                    member_kind,
                    container_name.as_deref(),
                    spans,
                );
                found = true;
            }
        }

        found
    }

    /// Map a node kind to the chunk kind it produces, per language
    fn classify(&self, node: Node) -> Classified {
        let kind = node.kind();
        match self.language {
            Language::Rust => match kind {
                "function_item" => Classified::Definition(ChunkKind::Function),
                "struct_item" | "enum_item" | "trait_item" | "union_item" => {
                    Classified::Definition(ChunkKind::Class)
                }
                "impl_item" => Classified::Definition(ChunkKind::Class),
                "mod_item" => Classified::Definition(ChunkKind::Module),
                "use_declaration" | "extern_crate_declaration" => Classified::Import,
                _ => Classified::Other,
            },
            Language::Python => match kind {
                "function_definition" => Classified::Definition(ChunkKind::Function),
                "class_definition" => Classified::Definition(ChunkKind::Class),
                "decorated_definition" => Classified::Wrapper,
                "import_statement" | "import_from_statement" => Classified::Import,
                _ => Classified::Other,
            },
            Language::JavaScript | Language::TypeScript => match kind {
                "function_declaration" | "generator_function_declaration" => {
                    Classified::Definition(ChunkKind::Function)
                }
                "class_declaration" | "interface_declaration" | "enum_declaration" => {
                    Classified::Definition(ChunkKind::Class)
                }
                "method_definition" => Classified::Definition(ChunkKind::Method),
                "export_statement" => Classified::Wrapper,
                "import_statement" => Classified::Import,
                _ => Classified::Other,
            },
            _ => Classified::Other,
        }
    }

    /// Kind of the declaration inside an export/decorator wrapper
    fn wrapped_definition_kind(&self, node: Node) -> Option<ChunkKind> {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if let Classified::Definition(kind) = self.classify(child) {
                return Some(kind);
            }
        }
        None
    }

    /// Symbol name, qualified by the containing type for methods
    fn qualified_symbol(
        &self,
        content: &str,
        node: Node,
        parent: Option<&str>,
    ) -> Option<String> {
        let name = match node.kind() {
            // impl Foo { .. } names the type it implements
            "impl_item" => extract_impl_target(content, node),
            _ => extract_symbol_name(content, node),
        }?;

        match parent {
            Some(scope) => {
                let sep = if self.language == Language::Rust {
                    "::"
                } else {
                    "."
                };
                Some(format!("{scope}{sep}{name}"))
            }
            None => Some(name),
        }
    }

    /// Turn the text between collected spans into module chunks.
    ///
    /// Whitespace-only gaps are skipped; gaps larger than the chunk size
    /// get windowed instead of emitted whole.
    fn cover_gaps(&self, content: &str, spans: Vec<Span>) -> Vec<Span> {
        let mut out = Vec::with_capacity(spans.len() + 4);
        let mut pos = 0usize;

        for span in spans {
            if span.start_byte > pos {
                self.emit_gap(content, pos, span.start_byte, &mut out);
            }
            pos = pos.max(span.end_byte);
            out.push(span);
        }

        if pos < content.len() {
            self.emit_gap(content, pos, content.len(), &mut out);
        }

        out.sort_by_key(|s| (s.start_byte, s.end_byte));
        out
    }

    fn emit_gap(&self, content: &str, start: usize, end: usize, out: &mut Vec<Span>) {
        let gap = &content[start..end];
        let Some(first) = gap.find(|c: char| !c.is_whitespace()) else {
            return;
        };
        let last = gap
            .rfind(|c: char| !c.is_whitespace())
            .map(|i| i + gap[i..].chars().next().map_or(1, char::len_utf8))
            .unwrap_or(gap.len());

        // Snap the leading edge back to the start of its line.
        let lead = gap[..first].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let gap_start = start + lead;
        let gap_end = start + last;

        let slice = &content[gap_start..gap_end];
        if slice.chars().count() <= self.config.chunk_size {
            out.push(Span {
                start_byte: gap_start,
                end_byte: gap_end,
                kind: ChunkKind::Module,
                symbol: None,
            });
            return;
        }

        for (s, e) in
            window::window_spans(slice, self.config.chunk_size, self.config.window_step())
        {
            out.push(Span {
                start_byte: gap_start + s,
                end_byte: gap_start + e,
                kind: ChunkKind::TextWindow,
                symbol: None,
            });
        }
    }

    /// Merge adjacent small module/import spans up to the chunk size
    fn merge_small(&self, content: &str, spans: Vec<Span>) -> Vec<Span> {
        let mergeable =
            |s: &Span| matches!(s.kind, ChunkKind::Module | ChunkKind::ImportBlock);

        let mut out: Vec<Span> = Vec::with_capacity(spans.len());
        for span in spans {
            if let Some(prev) = out.last_mut() {
                let contiguous = content[prev.end_byte..span.start_byte.max(prev.end_byte)]
                    .chars()
                    .all(char::is_whitespace)
                    && span.start_byte >= prev.end_byte;
                let combined = &content[prev.start_byte..span.end_byte.max(prev.end_byte)];

                if mergeable(prev)
                    && mergeable(&span)
                    && contiguous
                    && combined.chars().count() <= self.config.chunk_size
                {
                    let kind = if prev.kind == ChunkKind::ImportBlock
                        && span.kind == ChunkKind::ImportBlock
                    {
                        ChunkKind::ImportBlock
                    } else {
                        ChunkKind::Module
                    };
                    prev.end_byte = prev.end_byte.max(span.end_byte);
                    prev.kind = kind;
                    prev.symbol = None;
                    continue;
                }
            }
            out.push(span);
        }
        out
    }

    /// Slice the original content and compute 1-based line numbers
    fn materialize(&self, content: &str, source_path: &str, span: &Span) -> Chunk {
        let slice = &content[span.start_byte..span.end_byte];
        let start_line = 1 + count_newlines(&content[..span.start_byte]);
        let mut end_line = 1 + count_newlines(&content[..span.end_byte]);
        if slice.ends_with('\n') && end_line > start_line {
            end_line -= 1;
        }

        Chunk {
            source_path: source_path.to_string(),
            start_line,
            end_line: end_line.max(start_line),
            content: slice.to_string(),
            language: self.language.as_str().to_string(),
            kind: span.kind,
            symbol_name: span.symbol.clone(),
        }
    }
}

enum Classified {
    Definition(ChunkKind),
    Import,
    Wrapper,
    Other,
}

fn count_newlines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}

/// Extract a declaration's name from its identifier child
fn extract_symbol_name(content: &str, node: Node) -> Option<String> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        let is_name_node = matches!(
            child.kind(),
            "identifier" | "name" | "type_identifier" | "field_identifier" | "property_identifier"
        );
        if is_name_node {
            return Some(content[child.start_byte()..child.end_byte()].to_string());
        }
    }
    None
}

/// Extract the target type name of a Rust impl block
fn extract_impl_target(content: &str, impl_node: Node) -> Option<String> {
    let mut cursor = impl_node.walk();
    for child in impl_node.children(&mut cursor) {
        match child.kind() {
            "type_identifier" => {
                return Some(content[child.start_byte()..child.end_byte()].to_string());
            }
            "generic_type" | "scoped_type_identifier" => {
                let mut type_cursor = child.walk();
                for type_child in child.children(&mut type_cursor) {
                    if type_child.kind() == "type_identifier" {
                        return Some(
                            content[type_child.start_byte()..type_child.end_byte()].to_string(),
                        );
                    }
                }
            }
            _ => {}
        }
    }
    None
}
