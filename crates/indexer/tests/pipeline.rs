use async_trait::async_trait;
use ctxai_embeddings::{EmbeddingError, EmbeddingProvider, StubProvider};
use ctxai_indexer::{query_index, Config, IndexPipeline, IndexerError, Stage};
use ctxai_vector_store::VectorStore;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn provider() -> Arc<StubProvider> {
    Arc::new(StubProvider::default())
}

fn write_project(root: &Path) {
    fs::write(
        root.join("main.rs"),
        "fn main() {\n    println!(\"hello\");\n}\n",
    )
    .unwrap();
    fs::write(
        root.join("lib.py"),
        "def greet(name):\n    return f\"hi {name}\"\n",
    )
    .unwrap();
    fs::write(root.join("README.md"), "# demo project\nsome prose here\n").unwrap();
}

async fn open_store(root: &Path, name: &str) -> VectorStore {
    VectorStore::open(ctxai_indexer::index_dir(root, name))
        .await
        .unwrap()
}

#[tokio::test]
async fn full_run_indexes_and_is_idempotent() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path());

    let pipeline =
        IndexPipeline::new(temp.path(), Config::default(), provider()).unwrap();
    let summary = pipeline.run("default").await.unwrap();

    assert_eq!(summary.files_indexed, 3);
    assert!(summary.chunks_produced > 0);
    assert_eq!(summary.chunks_stored, summary.chunks_produced);
    assert_eq!(summary.chunks_failed, 0);
    assert!(!summary.cancelled);

    let store = open_store(temp.path(), "default").await;
    let first_len = store.len();
    assert_eq!(first_len, summary.chunks_stored);

    // Unchanged project, second run: same records, no duplicates.
    let again = pipeline.run("default").await.unwrap();
    assert_eq!(again.chunks_stored, summary.chunks_stored);
    let store = open_store(temp.path(), "default").await;
    assert_eq!(store.len(), first_len);
}

#[tokio::test]
async fn query_returns_nearest_chunks() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path());

    let provider = provider();
    IndexPipeline::new(temp.path(), Config::default(), provider.clone())
        .unwrap()
        .run("default")
        .await
        .unwrap();

    let results = query_index(temp.path(), provider.as_ref(), "default", "greet", 2)
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert!(results[0].distance <= results[1].distance);
}

#[tokio::test]
async fn oversized_project_is_rejected_before_any_write() {
    let temp = TempDir::new().unwrap();
    for i in 0..5 {
        fs::write(temp.path().join(format!("f{i}.rs")), "fn f() {}\n").unwrap();
    }

    let mut config = Config::default();
    config.indexing.max_files = 4;
    let pipeline = IndexPipeline::new(temp.path(), config, provider()).unwrap();

    let err = pipeline.run("default").await.unwrap_err();
    assert!(matches!(err, IndexerError::ProjectTooLarge(_)));
    assert!(err.to_string().contains("max_files"));

    let store = open_store(temp.path(), "default").await;
    assert!(store.is_empty());
}

#[tokio::test]
async fn exactly_at_file_limit_still_indexes() {
    let temp = TempDir::new().unwrap();
    for i in 0..4 {
        fs::write(temp.path().join(format!("f{i}.rs")), "fn f() {}\n").unwrap();
    }

    let mut config = Config::default();
    config.indexing.max_files = 4;
    let pipeline = IndexPipeline::new(temp.path(), config, provider()).unwrap();

    let summary = pipeline.run("default").await.unwrap();
    assert_eq!(summary.files_indexed, 4);
    // At the limit the run proceeds but says it is close.
    assert!(summary.warnings.iter().any(|w| w.contains("approaching")));
}

#[tokio::test]
async fn skips_binary_ignored_and_excluded_files() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("keep.rs"), "fn keep() {}\n").unwrap();
    fs::write(temp.path().join("blob.png"), [0u8, 1, 2, 3]).unwrap();
    fs::write(temp.path().join("generated.rs"), "fn gen() {}\n").unwrap();
    fs::write(temp.path().join(".gitignore"), "generated.rs\n").unwrap();
    fs::write(temp.path().join("skip_me.rs"), "fn skip() {}\n").unwrap();

    let mut config = Config::default();
    config.indexing.exclude = vec!["skip_me.rs".to_string(), ".gitignore".to_string()];
    let pipeline = IndexPipeline::new(temp.path(), config, provider()).unwrap();

    let summary = pipeline.run("default").await.unwrap();
    assert_eq!(summary.files_indexed, 1);
    assert_eq!(summary.files_skipped_binary, 1);

    let store = open_store(temp.path(), "default").await;
    let stats = store.stats();
    assert_eq!(stats.unique_files, 1);
}

#[tokio::test]
async fn oversized_file_is_skipped_not_fatal() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("small.rs"), "fn s() {}\n").unwrap();
    let big = "x".repeat(2 * 1024 * 1024);
    fs::write(temp.path().join("big.txt"), &big).unwrap();

    let mut config = Config::default();
    config.indexing.max_file_size_mb = 1;
    config.indexing.max_total_size_mb = 100;
    let pipeline = IndexPipeline::new(temp.path(), config, provider()).unwrap();

    let summary = pipeline.run("default").await.unwrap();
    assert_eq!(summary.files_indexed, 1);
    assert_eq!(summary.files_skipped_oversized, 1);
    assert!(summary.warnings.iter().any(|w| w.contains("big.txt")));
}

/// Fails its first N embed calls, then behaves like the stub.
struct FlakyProvider {
    inner: StubProvider,
    failures_left: AtomicUsize,
    fatal: bool,
}

impl FlakyProvider {
    fn new(failures: usize, fatal: bool) -> Self {
        Self {
            inner: StubProvider::default(),
            failures_left: AtomicUsize::new(failures),
            fatal,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FlakyProvider {
    async fn embed_batch(&self, texts: &[String]) -> ctxai_embeddings::Result<Vec<Vec<f32>>> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return if self.fatal {
                Err(EmbeddingError::fatal("model crashed"))
            } else {
                Err(EmbeddingError::batch_failed("transient upstream error"))
            };
        }
        self.inner.embed_batch(texts).await
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn max_batch_size(&self) -> usize {
        self.inner.max_batch_size()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

#[tokio::test]
async fn failed_batch_is_reported_and_others_survive() {
    let temp = TempDir::new().unwrap();
    for i in 0..3 {
        fs::write(temp.path().join(format!("f{i}.rs")), "fn f() {}\n").unwrap();
    }

    let mut config = Config::default();
    config.indexing.batch_size = 1; // one chunk per batch
    let provider = Arc::new(FlakyProvider::new(1, false));
    let pipeline = IndexPipeline::new(temp.path(), config, provider).unwrap();

    let summary = pipeline.run("default").await.unwrap();
    assert_eq!(summary.chunks_produced, 3);
    assert_eq!(summary.chunks_failed, 1);
    assert_eq!(summary.chunks_stored, 2);
    assert!(summary
        .warnings
        .iter()
        .any(|w| w.contains("embedding batch failed")));

    let store = open_store(temp.path(), "default").await;
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn fatal_provider_error_aborts_but_keeps_earlier_batches() {
    let temp = TempDir::new().unwrap();
    for i in 0..3 {
        fs::write(temp.path().join(format!("f{i}.rs")), "fn f() {}\n").unwrap();
    }

    let mut config = Config::default();
    config.indexing.batch_size = 1;
    // First call succeeds, second is fatal: the flaky wrapper fails up
    // front, so invert it by failing on the second call instead.
    struct FatalSecond {
        inner: StubProvider,
        calls: AtomicUsize,
    }
    #[async_trait]
    impl EmbeddingProvider for FatalSecond {
        async fn embed_batch(
            &self,
            texts: &[String],
        ) -> ctxai_embeddings::Result<Vec<Vec<f32>>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 1 {
                return Err(EmbeddingError::fatal("model crashed"));
            }
            self.inner.embed_batch(texts).await
        }
        fn dimension(&self) -> usize {
            self.inner.dimension()
        }
        fn max_batch_size(&self) -> usize {
            self.inner.max_batch_size()
        }
        fn model_id(&self) -> &str {
            self.inner.model_id()
        }
    }

    let provider = Arc::new(FatalSecond {
        inner: StubProvider::default(),
        calls: AtomicUsize::new(0),
    });
    let pipeline = IndexPipeline::new(temp.path(), config, provider).unwrap();

    let err = pipeline.run("default").await.unwrap_err();
    assert!(matches!(err, IndexerError::EmbeddingError(_)));

    // The batch persisted before the crash is still on disk.
    let store = open_store(temp.path(), "default").await;
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn reindex_replaces_stale_chunks_for_changed_files() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("code.rs"), "fn one() {}\n").unwrap();

    let provider = provider();
    let pipeline =
        IndexPipeline::new(temp.path(), Config::default(), provider.clone()).unwrap();
    pipeline.run("default").await.unwrap();

    // The file shrinks; the old span must not survive the re-run.
    fs::write(temp.path().join("code.rs"), "fn two() {}\nfn three() {}\n").unwrap();
    pipeline.run("default").await.unwrap();

    let store = open_store(temp.path(), "default").await;
    let query = provider.embed_batch(&["fn".to_string()]).await.unwrap();
    let results = store.query(&query[0], 10).unwrap();
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| !r.chunk.content.contains("one")));
}

#[tokio::test]
async fn cancelled_rerun_keeps_previously_persisted_records() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("code.rs"), "fn one() {}\n").unwrap();

    IndexPipeline::new(temp.path(), Config::default(), provider())
        .unwrap()
        .run("default")
        .await
        .unwrap();
    let before = open_store(temp.path(), "default").await.len();
    assert!(before > 0);

    // A re-run cancelled before any batch lands must not erase the
    // records the first run persisted.
    let pipeline =
        IndexPipeline::new(temp.path(), Config::default(), provider()).unwrap();
    pipeline.cancel_token().cancel();
    let summary = pipeline.run("default").await.unwrap();
    assert!(summary.cancelled);

    let store = open_store(temp.path(), "default").await;
    assert_eq!(store.len(), before);
}

#[tokio::test]
async fn failed_rerun_keeps_previously_persisted_records() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("code.rs"), "fn one() {}\n").unwrap();

    IndexPipeline::new(temp.path(), Config::default(), provider())
        .unwrap()
        .run("default")
        .await
        .unwrap();
    let before = open_store(temp.path(), "default").await.len();
    assert!(before > 0);

    // Every embed batch of the re-run fails; the old records survive.
    let provider = Arc::new(FlakyProvider::new(usize::MAX, false));
    let pipeline = IndexPipeline::new(temp.path(), Config::default(), provider).unwrap();
    let summary = pipeline.run("default").await.unwrap();
    assert_eq!(summary.chunks_failed, summary.chunks_produced);
    assert_eq!(summary.chunks_stored, 0);

    let store = open_store(temp.path(), "default").await;
    assert_eq!(store.len(), before);
}

#[tokio::test]
async fn cancellation_stops_between_batches() {
    let temp = TempDir::new().unwrap();
    for i in 0..3 {
        fs::write(temp.path().join(format!("f{i}.rs")), "fn f() {}\n").unwrap();
    }

    let mut config = Config::default();
    config.indexing.batch_size = 1;
    let pipeline = IndexPipeline::new(temp.path(), config, provider()).unwrap();
    pipeline.cancel_token().cancel();

    let summary = pipeline.run("default").await.unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.chunks_stored, 0);
    // Chunking already happened; only embedding and storage were skipped.
    assert_eq!(summary.chunks_produced, 3);
}

#[tokio::test]
async fn progress_reports_stages_in_order() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path());

    let stages: Arc<Mutex<Vec<Stage>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = stages.clone();
    let pipeline = IndexPipeline::new(temp.path(), Config::default(), provider())
        .unwrap()
        .with_progress(Box::new(move |p| {
            let mut stages = sink.lock().unwrap();
            if stages.last() != Some(&p.stage) {
                stages.push(p.stage);
            }
        }));

    pipeline.run("default").await.unwrap();

    let stages = stages.lock().unwrap();
    assert_eq!(stages.first(), Some(&Stage::Init));
    assert_eq!(stages.last(), Some(&Stage::Done));
    let position = |s: Stage| stages.iter().position(|&x| x == s).unwrap();
    assert!(position(Stage::Traverse) < position(Stage::Chunk));
    assert!(position(Stage::Chunk) < position(Stage::Embed));
    assert!(position(Stage::Embed) < position(Stage::Store));
}

#[tokio::test]
async fn model_change_is_refused() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path());

    IndexPipeline::new(temp.path(), Config::default(), provider())
        .unwrap()
        .run("default")
        .await
        .unwrap();

    // Same model id, different dimension: the store must refuse it.
    let other = Arc::new(StubProvider::new(128));
    let pipeline = IndexPipeline::new(temp.path(), Config::default(), other).unwrap();
    let err = pipeline.run("default").await.unwrap_err();
    assert!(matches!(err, IndexerError::VectorStoreError(_)));
}
