//! Change tracking against the source-of-truth relational store
//!
//! The [`SourceStore`] trait is the contract the tracker consumes: per-collection
//! row counts, a full scan of all live rows, and a diff scan that returns the
//! payload only for rows modified after a watermark. [`ChangeTracker`] turns
//! those scans into Added/Changed/Removed events.

pub mod memory;
pub mod postgres;
pub mod tracker;
pub mod types;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use tracker::ChangeTracker;
pub use types::{ChangeEvent, ChangeKind, EntityRef, SourceRow, SyncReport, TrackingEntry};

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use std::future::Future;

use crate::search::errors::SearchResult;

/// Access to the relational store that is mirrored into the index
///
/// Rows are delivered synchronously to `on_row` in scan order. An error
/// returned by `on_row` aborts the scan and is returned unchanged.
pub trait SourceStore: Send + Sync {
    /// Number of live rows per collection
    fn collection_sizes(&self) -> impl Future<Output = SearchResult<AHashMap<String, usize>>> + Send;

    /// Every live row with its payload
    fn scan_all<F>(&self, on_row: F) -> impl Future<Output = SearchResult<()>> + Send
    where
        F: FnMut(SourceRow) -> SearchResult<()> + Send;

    /// Every live row; the payload is only present for rows updated after `watermark`
    fn scan_since<F>(
        &self,
        watermark: DateTime<Utc>,
        on_row: F,
    ) -> impl Future<Output = SearchResult<()>> + Send
    where
        F: FnMut(SourceRow) -> SearchResult<()> + Send;
}
