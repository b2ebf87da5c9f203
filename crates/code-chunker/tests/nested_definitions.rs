use ctxai_code_chunker::{Chunk, ChunkKind, Chunker, ChunkerConfig};

fn chunk_with_size(code: &str, chunk_size: usize) -> Vec<Chunk> {
    let chunker = Chunker::new(ChunkerConfig {
        chunk_size,
        chunk_overlap: 20,
    })
    .expect("valid config");
    chunker.chunk_str(code, "nested.rs").expect("chunking failed")
}

#[test]
fn oversized_impl_inside_module_yields_method_chunks() {
    let filler = "        let _ = 0;\n".repeat(10);
    let code = format!(
        "mod api {{\n    pub struct Car;\n\n    impl Car {{\n        \
         pub fn drive(&self) {{\n{filler}        }}\n        \
         fn stop(&self) {{\n{filler}        }}\n    }}\n}}\n"
    );

    // Each method fits in a chunk on its own; the impl and the module
    // around it do not, so both levels get subdivided.
    let chunks = chunk_with_size(&code, 300);
    let methods: Vec<&str> = chunks
        .iter()
        .filter(|c| c.kind == ChunkKind::Method)
        .filter_map(|c| c.symbol_name.as_deref())
        .collect();

    assert!(
        methods.iter().any(|m| m.ends_with("drive")) && methods.iter().any(|m| m.ends_with("stop")),
        "expected method chunks inside module impl, got: {methods:?}"
    );
}

#[test]
fn small_impl_stays_whole() {
    let code = "impl Car {\n    fn drive(&self) {}\n    fn stop(&self) {}\n}\n";

    let chunks = chunk_with_size(code, 1000);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].kind, ChunkKind::Class);
    // The chunk ends at the closing brace; the trailing newline belongs
    // to no chunk.
    assert_eq!(chunks[0].content, code.trim_end());
    assert_eq!(chunks[0].end_line, 4);
}

#[test]
fn single_function_file_is_one_chunk() {
    let chunker = Chunker::new(ChunkerConfig::default()).expect("valid config");
    let code = "def greet(name):\n    message = f\"hi {name}\"\n    print(message)\n    print(\"done\")\n    return message\n";

    let chunks = chunker.chunk_str(code, "greet.py").expect("chunking failed");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].kind, ChunkKind::Function);
    assert_eq!(chunks[0].symbol_name.as_deref(), Some("greet"));
    assert_eq!(chunks[0].start_line, 1);
    assert_eq!(chunks[0].end_line, 5);
}

#[test]
fn every_line_is_covered_by_some_chunk() {
    let code = "use std::fmt;\n\nconst LIMIT: usize = 8;\n\nfn main() {\n    println!(\"{LIMIT}\");\n}\n";

    let chunks = chunk_with_size(code, 1000);
    for (idx, text) in code.lines().enumerate() {
        if text.trim().is_empty() {
            continue;
        }
        let line = idx + 1;
        assert!(
            chunks
                .iter()
                .any(|c| c.start_line <= line && line <= c.end_line),
            "line {line} not covered by any chunk: {text:?}"
        );
    }
}
