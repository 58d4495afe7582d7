//! Index engine keeping a tantivy index consistent with the source store
//!
//! `IndexEngine` owns the change tracker, the tantivy index, its single writer
//! and a manually reloaded reader. The initial build wipes and recreates the
//! on-disk index and feeds it a full scan; every refresh applies one diff scan.
//! Searchers only see the index as of the last successful commit.

use std::path::{Path, PathBuf};
use std::time::Instant;
use tantivy::directory::MmapDirectory;
use tantivy::{Index, IndexReader, IndexSettings, IndexWriter, ReloadPolicy, TantivyDocument};

use super::batch::BatchSink;
use super::errors::{RetryConfig, SearchError, SearchResult};
use super::query::{build_fuzzy_query, collect_references};
use super::runtime_helpers::retry_task;
use super::schema::SearchSchema;
use crate::config::SearchConfig;
use crate::model::SchemaProvider;
use crate::store::{ChangeTracker, EntityRef, SourceStore, SyncReport};

struct IndexHandle {
    index: Index,
    writer: IndexWriter,
    reader: IndexReader,
}

/// Text index mirroring a [`SourceStore`]
pub struct IndexEngine<S> {
    mapping: SearchSchema,
    tracker: ChangeTracker<S>,
    index_path: PathBuf,
    batch_size: usize,
    writer_memory: usize,
    max_results: usize,
    retry: RetryConfig,
    handle: Option<IndexHandle>,
}

impl<S: SourceStore> IndexEngine<S> {
    /// Map the schema and set up change tracking; no index exists until
    /// [`IndexEngine::initial_build`]
    pub fn new(config: &SearchConfig, schema: &impl SchemaProvider, store: S) -> Self {
        Self {
            mapping: SearchSchema::from_provider(schema, config.language()),
            tracker: ChangeTracker::new(store, config.min_sync_age()),
            index_path: config.index_path().to_path_buf(),
            batch_size: config.batch_size(),
            writer_memory: config.writer_memory(),
            max_results: config.max_results(),
            retry: RetryConfig::default(),
            handle: None,
        }
    }

    /// Recreate the on-disk index and fill it from a full scan of the store
    ///
    /// # Errors
    ///
    /// `IndexBuild` if the index cannot be recreated, store errors if the scan
    /// fails, `IndexWrite` if staged documents cannot be written.
    pub async fn initial_build(&mut self) -> SearchResult<SyncReport> {
        let start = Instant::now();

        // The old writer holds the directory lock.
        self.handle = None;
        let mut handle = self.create_index().await?;

        let Self {
            mapping,
            tracker,
            batch_size,
            ..
        } = self;
        let mut sink = BatchSink::new(mapping, &mut handle.writer, *batch_size);
        let report = tracker.full_scan(|event| sink.apply(event)).await?;
        let summary = sink.commit()?;

        handle
            .reader
            .reload()
            .map_err(|e| SearchError::IndexBuild(format!("Failed to reload reader: {e}")))?;

        tracing::info!(
            path = %self.index_path.display(),
            documents = handle.reader.searcher().num_docs(),
            staged = summary.staged,
            batches = summary.flushes,
            duration_ms = start.elapsed().as_millis() as u64,
            "Built initial text index"
        );

        self.handle = Some(handle);
        Ok(report)
    }

    /// Apply one diff scan of the store to the index
    ///
    /// Events the tracker already accounted for are committed even when the
    /// scan fails part way, so cache and index do not drift apart.
    ///
    /// # Errors
    ///
    /// `IndexClosed` before the initial build or after `close`; otherwise the
    /// error of the scan or of the index write.
    pub async fn refresh(&mut self) -> SearchResult<SyncReport> {
        let Self {
            mapping,
            tracker,
            handle,
            batch_size,
            ..
        } = self;
        let handle = handle.as_mut().ok_or(SearchError::IndexClosed)?;

        let mut sink = BatchSink::new(mapping, &mut handle.writer, *batch_size);
        let scanned = tracker.incremental_sync(|event| sink.apply(event)).await;
        let committed = sink.commit();

        let report = scanned?;
        let summary = committed?;

        if summary.staged > 0 {
            handle
                .reader
                .reload()
                .map_err(|e| SearchError::IndexWrite(format!("Failed to reload reader: {e}")))?;
            tracing::debug!(
                staged = summary.staged,
                batches = summary.flushes,
                "Applied index refresh"
            );
        }
        Ok(report)
    }

    /// Fuzzy search across every mapped text field
    ///
    /// Returns references ordered by relevance, each at most once. Text that
    /// analyzes to no terms yields an empty result.
    ///
    /// # Errors
    ///
    /// `IndexClosed` when no index is open, `SearchExecution` when the search
    /// or a document read fails.
    pub fn search(&self, text: &str) -> SearchResult<Vec<EntityRef>> {
        let handle = self.handle.as_ref().ok_or(SearchError::IndexClosed)?;

        let Some(query) = build_fuzzy_query(&self.mapping, &handle.index, text) else {
            tracing::debug!(query = %text, "Query produced no terms");
            return Ok(Vec::new());
        };

        let searcher = handle.reader.searcher();
        collect_references(&self.mapping, &searcher, query.as_ref(), self.max_results)
    }

    /// Release the index and delete its directory
    ///
    /// Calling it again, or before the initial build, does nothing.
    ///
    /// # Errors
    ///
    /// `Io` if the index directory cannot be removed.
    pub async fn close(&mut self) -> SearchResult<()> {
        let Some(IndexHandle {
            index,
            writer,
            reader,
        }) = self.handle.take()
        else {
            return Ok(());
        };

        drop(reader);
        if let Err(e) = writer.wait_merging_threads() {
            tracing::warn!(error = %e, "Index merge threads did not finish cleanly");
        }
        drop(index);

        match tokio::fs::remove_dir_all(&self.index_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(SearchError::Io(e)),
        }
        tracing::info!(path = %self.index_path.display(), "Closed text index");
        Ok(())
    }

    async fn create_index(&self) -> SearchResult<IndexHandle> {
        let path = self.index_path.as_path();
        remove_existing(path).await?;
        tokio::fs::create_dir_all(path).await.map_err(|e| {
            SearchError::IndexBuild(format!(
                "Failed to create index directory {}: {e}",
                path.display()
            ))
        })?;

        let directory = MmapDirectory::open(path).map_err(|e| {
            SearchError::IndexBuild(format!("Failed to open index directory {}: {e}", path.display()))
        })?;
        let index = Index::create(directory, self.mapping.schema().clone(), IndexSettings::default())
            .map_err(|e| SearchError::IndexBuild(format!("Failed to create index: {e}")))?;
        self.mapping.register_tokenizers(index.tokenizers());

        let memory = self.writer_memory;
        let writer = retry_task(self.retry.clone(), || {
            let index = index.clone();
            async move {
                index.writer::<TantivyDocument>(memory).map_err(|e| {
                    SearchError::WriterAcquisition(format!(
                        "Failed to acquire index writer with {}MB limit: {e}",
                        memory / 1_000_000
                    ))
                })
            }
        })
        .await?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| SearchError::IndexBuild(format!("Failed to create index reader: {e}")))?;

        Ok(IndexHandle {
            index,
            writer,
            reader,
        })
    }

    /// Whether an index is open for searching
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Number of documents visible to searchers
    #[must_use]
    pub fn num_docs(&self) -> u64 {
        self.handle
            .as_ref()
            .map_or(0, |handle| handle.reader.searcher().num_docs())
    }

    #[must_use]
    pub fn tracker(&self) -> &ChangeTracker<S> {
        &self.tracker
    }

    #[must_use]
    pub fn mapping(&self) -> &SearchSchema {
        &self.mapping
    }

    #[must_use]
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }
}

async fn remove_existing(path: &Path) -> SearchResult<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Removed previous index");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SearchError::IndexBuild(format!(
            "Failed to remove previous index {}: {e}",
            path.display()
        ))),
    }
}
