//! In-process source store
//!
//! Mirrors the semantics of the Postgres store (soft deletes, watermark-gated
//! payloads) without a database. Used by tests and by embedders that already
//! hold their records in memory.

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::SourceStore;
use super::types::SourceRow;
use crate::search::errors::{SearchError, SearchResult};

#[derive(Debug, Clone)]
struct MemoryRow {
    payload: String,
    updated_at: DateTime<Utc>,
    deleted: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    rows: BTreeMap<String, MemoryRow>,
    unavailable: bool,
}

/// Cloneable handle to a shared in-memory table of records
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record, stamped with the current time
    pub fn upsert(&self, reference: &str, payload: impl Into<String>) {
        self.upsert_at(reference, payload, Utc::now());
    }

    /// Insert or replace a record with an explicit modification time
    pub fn upsert_at(&self, reference: &str, payload: impl Into<String>, updated_at: DateTime<Utc>) {
        self.state.lock().rows.insert(
            reference.to_string(),
            MemoryRow {
                payload: payload.into(),
                updated_at,
                deleted: false,
            },
        );
    }

    /// Soft-delete a record; returns false if it was not live
    pub fn delete(&self, reference: &str) -> bool {
        let mut state = self.state.lock();
        match state.rows.get_mut(reference) {
            Some(row) if !row.deleted => {
                row.deleted = true;
                row.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }

    /// Simulate an outage: every scan fails with a connection error while set
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    /// Number of live records
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().rows.values().filter(|r| !r.deleted).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> SearchResult<Vec<(String, MemoryRow)>> {
        let state = self.state.lock();
        if state.unavailable {
            return Err(SearchError::Connection("memory store unavailable".to_string()));
        }
        Ok(state
            .rows
            .iter()
            .filter(|(_, row)| !row.deleted)
            .map(|(reference, row)| (reference.clone(), row.clone()))
            .collect())
    }
}

impl SourceStore for MemoryStore {
    async fn collection_sizes(&self) -> SearchResult<AHashMap<String, usize>> {
        let mut sizes = AHashMap::new();
        for (reference, _) in self.snapshot()? {
            if let Some((collection, _)) = reference.split_once('/') {
                *sizes.entry(collection.to_string()).or_insert(0) += 1;
            }
        }
        Ok(sizes)
    }

    async fn scan_all<F>(&self, mut on_row: F) -> SearchResult<()>
    where
        F: FnMut(SourceRow) -> SearchResult<()> + Send,
    {
        for (reference, row) in self.snapshot()? {
            on_row(SourceRow {
                reference,
                payload: Some(row.payload),
                updated_at: row.updated_at,
            })?;
        }
        Ok(())
    }

    async fn scan_since<F>(&self, watermark: DateTime<Utc>, mut on_row: F) -> SearchResult<()>
    where
        F: FnMut(SourceRow) -> SearchResult<()> + Send,
    {
        for (reference, row) in self.snapshot()? {
            let payload = (row.updated_at > watermark).then_some(row.payload);
            on_row(SourceRow {
                reference,
                payload,
                updated_at: row.updated_at,
            })?;
        }
        Ok(())
    }
}
