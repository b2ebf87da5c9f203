use crate::config::Config;
use crate::error::{IndexerError, Result};
use crate::guard::{ProjectStats, SizeCheck, SizeGuard};
use crate::home;
use crate::scanner::{FileScanner, ScanConfig, ScannedFile};
use crate::summary::{IndexSummary, Progress, Stage};
use ctxai_code_chunker::{Chunk, Chunker, ChunkerConfig, Language};
use ctxai_embeddings::EmbeddingProvider;
use ctxai_vector_store::{IndexRecord, SearchResult, VectorStore, VectorStoreError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(test)]
use std::sync::atomic::AtomicUsize;

/// Attempts at persisting one batch before its chunks count as failed
const STORE_ATTEMPTS: u32 = 3;

/// Callback invoked with progress events during a run
pub type ProgressFn = Box<dyn Fn(Progress) + Send + Sync>;

/// Cooperative cancellation handle.
///
/// Checked between batches; the batch in flight always completes and
/// everything persisted so far stays persisted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Orchestrates a full indexing run: traverse, size-check, chunk,
/// embed, store.
pub struct IndexPipeline {
    root: PathBuf,
    config: Config,
    provider: Arc<dyn EmbeddingProvider>,
    progress: Option<ProgressFn>,
    cancel: CancelToken,
    /// Remaining storage attempts to fail artificially, for tests
    #[cfg(test)]
    storage_faults: AtomicUsize,
}

impl IndexPipeline {
    pub fn new(
        root: impl AsRef<Path>,
        config: Config,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(IndexerError::InvalidPath(format!(
                "not a directory: {}",
                root.display()
            )));
        }
        Ok(Self {
            root,
            config,
            provider,
            progress: None,
            cancel: CancelToken::new(),
            #[cfg(test)]
            storage_faults: AtomicUsize::new(0),
        })
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Handle for cancelling this run from another task
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn report(&self, stage: Stage, current: usize, total: usize) {
        if let Some(progress) = &self.progress {
            progress(Progress {
                stage,
                current,
                total,
            });
        }
    }

    /// Run a full indexing pass into the named index.
    ///
    /// Failed batches are reported in the summary instead of aborting
    /// the run; only a fatal provider error, a rejected project or a
    /// model mismatch ends it early. Whatever was persisted before an
    /// early end stays on disk.
    pub async fn run(&self, index_name: &str) -> Result<IndexSummary> {
        let started = Instant::now();
        let mut summary = IndexSummary::default();

        self.report(Stage::Init, 0, 1);
        let store_dir = home::index_dir(&self.root, index_name);
        let mut store = VectorStore::open(&store_dir).await?;
        store.check_model(self.provider.model_id(), self.provider.dimension())?;

        self.report(Stage::Traverse, 0, 1);
        let indexing = &self.config.indexing;
        let scanner = FileScanner::new(
            &self.root,
            ScanConfig {
                include: indexing.include.clone(),
                exclude: indexing.exclude.clone(),
                follow_ignore_file: indexing.follow_ignore_file,
            },
        )?;
        let outcome = scanner.scan();
        summary.files_skipped_binary = outcome.binary_skipped;
        for warning in &outcome.warnings {
            summary.add_warning(warning.clone());
        }

        self.report(Stage::SizeCheck, 0, 1);
        let stats = ProjectStats::collect(&outcome.files, indexing.max_file_size_bytes());
        match SizeGuard::new(indexing).check(&stats) {
            SizeCheck::Reject(messages) => {
                self.report(Stage::Failed, 0, 1);
                return Err(IndexerError::ProjectTooLarge(messages.join("; ")));
            }
            SizeCheck::Warn(messages) => {
                for message in messages {
                    log::warn!("{message}");
                    summary.add_warning(message);
                }
            }
            SizeCheck::Ok => {}
        }
        summary.files_skipped_oversized = stats.oversized.len();
        let oversized: Vec<&str> = stats.oversized.iter().map(|(p, _)| p.as_str()).collect();
        let files: Vec<&ScannedFile> = outcome
            .files
            .iter()
            .filter(|f| !oversized.contains(&f.rel_path.as_str()))
            .collect();

        let chunker = Chunker::new(ChunkerConfig {
            chunk_size: indexing.chunk_size,
            chunk_overlap: indexing.chunk_overlap,
        })?;

        let mut chunks: Vec<Chunk> = Vec::new();
        // Per-file bookkeeping for stale-record cleanup: which ids are
        // fresh, and how many of the file's chunks still await storage.
        let mut fresh_ids: HashMap<String, HashSet<String>> = HashMap::new();
        let mut pending: HashMap<String, usize> = HashMap::new();
        let total_files = files.len();
        for (i, file) in files.iter().enumerate() {
            self.report(Stage::Chunk, i, total_files);
            let file_chunks = match chunker.chunk_file(&file.path, &file.rel_path) {
                Ok(chunks) => chunks,
                Err(e) => {
                    log::warn!("Skipping {}: {e}", file.rel_path);
                    summary.add_warning(format!("cannot chunk {}: {e}", file.rel_path));
                    continue;
                }
            };

            if took_fallback(&file.rel_path, &file_chunks) {
                summary.fallback_files += 1;
                summary.add_warning(format!(
                    "structural parsing fell back to text windows for {}",
                    file.rel_path
                ));
            }

            fresh_ids.insert(
                file.rel_path.clone(),
                file_chunks.iter().map(Chunk::stable_id).collect(),
            );
            pending.insert(file.rel_path.clone(), file_chunks.len());

            summary.files_indexed += 1;
            summary.chunks_produced += file_chunks.len();
            chunks.extend(file_chunks);
        }
        self.report(Stage::Chunk, total_files, total_files);

        let batch_size = indexing.batch_size.min(self.provider.max_batch_size()).max(1);
        let total_chunks = chunks.len();
        let mut processed = 0usize;
        let mut failed_files: HashSet<String> = HashSet::new();

        for batch in chunks.chunks(batch_size) {
            if self.cancel.is_cancelled() {
                log::info!("Indexing cancelled after {processed} of {total_chunks} chunks");
                summary.cancelled = true;
                break;
            }

            self.report(Stage::Embed, processed, total_chunks);
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vectors = match self.provider.embed_batch(&texts).await {
                Ok(vectors) => vectors,
                Err(e) if e.is_fatal() => {
                    log::error!("Embedding provider failed: {e}");
                    store.save().await?;
                    self.report(Stage::Failed, processed, total_chunks);
                    return Err(e.into());
                }
                Err(e) => {
                    log::warn!("Embedding batch failed, skipping {} chunks: {e}", batch.len());
                    summary.add_warning(format!("embedding batch failed: {e}"));
                    summary.chunks_failed += batch.len();
                    for chunk in batch {
                        failed_files.insert(chunk.source_path.clone());
                    }
                    processed += batch.len();
                    continue;
                }
            };
            summary.chunks_embedded += batch.len();

            self.report(Stage::Store, processed, total_chunks);
            let records: Vec<IndexRecord> = batch
                .iter()
                .cloned()
                .zip(vectors)
                .map(|(chunk, vector)| IndexRecord::new(index_name, chunk, vector))
                .collect();
            match self.persist_batch(&mut store, records).await {
                Ok(()) => {
                    summary.chunks_stored += batch.len();
                    for chunk in batch {
                        if let Some(left) = pending.get_mut(&chunk.source_path) {
                            *left = left.saturating_sub(1);
                        }
                    }
                }
                Err(e) if is_dimension_error(&e) => {
                    store.save().await?;
                    self.report(Stage::Failed, processed, total_chunks);
                    return Err(e);
                }
                Err(e) => {
                    log::warn!("Storage batch failed, skipping {} chunks: {e}", batch.len());
                    summary.add_warning(format!("storage batch failed: {e}"));
                    summary.chunks_failed += batch.len();
                    for chunk in batch {
                        failed_files.insert(chunk.source_path.clone());
                    }
                }
            }
            processed += batch.len();
        }

        // Drop stale spans only for files whose fresh chunks all made it
        // into the store; failed or unprocessed files keep their
        // previous records.
        for (path, ids) in &fresh_ids {
            if failed_files.contains(path) || pending.get(path).is_some_and(|left| *left > 0) {
                continue;
            }
            let removed = store.remove_stale(path, ids);
            if removed > 0 {
                log::debug!("Dropped {removed} stale records for {path}");
            }
        }

        store.save().await?;
        summary.duration_ms = started.elapsed().as_millis() as u64;
        self.report(Stage::Done, total_chunks, total_chunks);
        log::info!(
            "Indexed {} files, {} chunks stored, {} failed in {} ms",
            summary.files_indexed,
            summary.chunks_stored,
            summary.chunks_failed,
            summary.duration_ms
        );
        Ok(summary)
    }

    /// Upsert and save one batch, retrying transient failures.
    ///
    /// Upserts are keyed, so a retry after a partial save is a no-op
    /// rewrite rather than a duplicate. A dimension mismatch is not
    /// transient and propagates on the first attempt.
    async fn persist_batch(
        &self,
        store: &mut VectorStore,
        records: Vec<IndexRecord>,
    ) -> Result<()> {
        let mut last_err = None;
        for attempt in 0..STORE_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(100 * u64::from(attempt))).await;
            }
            #[cfg(test)]
            if self.storage_faults.load(Ordering::SeqCst) > 0 {
                self.storage_faults.fetch_sub(1, Ordering::SeqCst);
                last_err = Some(IndexerError::IoError(std::io::Error::other(
                    "storage unavailable",
                )));
                continue;
            }
            match store.upsert(records.clone()) {
                Ok(_) => match store.save().await {
                    Ok(()) => return Ok(()),
                    Err(e) => last_err = Some(IndexerError::from(e)),
                },
                Err(e) => {
                    let e = IndexerError::from(e);
                    if is_dimension_error(&e) {
                        return Err(e);
                    }
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            IndexerError::IoError(std::io::Error::other("batch persistence failed"))
        }))
    }
}

/// Wrong-width vectors mean the provider and the index disagree; no
/// retry can fix that, so the run aborts instead of skipping the batch.
fn is_dimension_error(e: &IndexerError) -> bool {
    matches!(
        e,
        IndexerError::VectorStoreError(VectorStoreError::DimensionMismatch { .. })
    )
}

/// A file counts as a fallback when its language has a grammar but
/// every chunk still came out as a text window.
fn took_fallback(source_path: &str, chunks: &[Chunk]) -> bool {
    Language::from_path(source_path).supports_ast()
        && !chunks.is_empty()
        && chunks.iter().all(|c| !c.kind.is_structural())
}

/// Embed a query string and search the named index.
pub async fn query_index(
    project_root: &Path,
    provider: &dyn EmbeddingProvider,
    index_name: &str,
    query: &str,
    top_k: usize,
) -> Result<Vec<SearchResult>> {
    let store = VectorStore::open(home::index_dir(project_root, index_name)).await?;
    let mut vectors = provider.embed_batch(&[query.to_string()]).await?;
    let vector = vectors
        .pop()
        .ok_or(ctxai_embeddings::EmbeddingError::CountMismatch {
            expected: 1,
            actual: 0,
        })?;
    Ok(store.query(&vector, top_k)?)
}
