//! Incremental diff against the source store
//!
//! The tracker caches one [`TrackingEntry`] per live record. Every diff scan
//! tags the entries it observes with the next sweep generation; whatever keeps
//! an older generation afterwards was not returned by the store, so it has been
//! deleted there and is reported as removed.

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use std::collections::hash_map::Entry;
use std::time::{Duration, Instant};

use super::SourceStore;
use super::types::{ChangeEvent, EntityRef, SourceRow, SyncReport, TrackingEntry};
use crate::search::errors::SearchResult;

/// Change-tracking cache over a [`SourceStore`]
#[derive(Debug)]
pub struct ChangeTracker<S> {
    store: S,
    min_age: Duration,
    watermark: Option<DateTime<Utc>>,
    last_sync: Option<Instant>,
    generation: u16,
    collections: AHashMap<String, AHashMap<u64, TrackingEntry>>,
}

/// Parse the reference of a row, logging and counting it when malformed
fn parse_reference(row: &SourceRow, report: &mut SyncReport) -> Option<EntityRef> {
    match row.reference.parse::<EntityRef>() {
        Ok(reference) => Some(reference),
        Err(e) => {
            report.malformed += 1;
            tracing::error!(error = %e, "Skipping row with malformed reference");
            None
        }
    }
}

impl<S: SourceStore> ChangeTracker<S> {
    /// Create a tracker; syncs younger than `min_age` are skipped
    #[must_use]
    pub fn new(store: S, min_age: Duration) -> Self {
        Self {
            store,
            min_age,
            watermark: None,
            last_sync: None,
            generation: 0,
            collections: AHashMap::new(),
        }
    }

    /// Read every live record and report it as added
    ///
    /// The cache is replaced only when the whole scan succeeds.
    pub async fn full_scan<H>(&mut self, mut handler: H) -> SearchResult<SyncReport>
    where
        H: FnMut(ChangeEvent) -> SearchResult<()> + Send,
    {
        let wall_start = Utc::now();
        let start = Instant::now();

        let mut collections: AHashMap<String, AHashMap<u64, TrackingEntry>> = self
            .store
            .collection_sizes()
            .await?
            .into_iter()
            .map(|(name, size)| (name, AHashMap::with_capacity(size)))
            .collect();

        let generation = self.generation;
        let mut report = SyncReport::default();
        let mut payload_bytes = 0usize;

        self.store
            .scan_all(|row| {
                report.entries += 1;
                let Some(reference) = parse_reference(&row, &mut report) else {
                    return Ok(());
                };
                let payload = row.payload.unwrap_or_default();
                payload_bytes += payload.len();

                let entries = collections
                    .entry(reference.collection.clone())
                    .or_insert_with(|| {
                        tracing::warn!(
                            collection = %reference.collection,
                            "Allocating collection that was missing from the size count"
                        );
                        AHashMap::new()
                    });
                entries.insert(
                    reference.id,
                    TrackingEntry {
                        updated_at: row.updated_at,
                        generation,
                    },
                );

                report.added += 1;
                handler(ChangeEvent::Added { reference, payload })
            })
            .await?;

        report.duration = start.elapsed();
        tracing::info!(
            entries = report.entries,
            collections = collections.len(),
            size_mib = %format!("{:.2}", payload_bytes as f64 / (1024.0 * 1024.0)),
            duration_ms = report.duration.as_millis() as u64,
            "Initial source store scan finished"
        );

        self.collections = collections;
        self.watermark = Some(wall_start);
        self.last_sync = Some(start);
        Ok(report)
    }

    /// Diff the store against the cache and report what changed since the watermark
    ///
    /// Skipped (with an empty report) when the previous sync finished less than
    /// the minimum age ago.
    pub async fn incremental_sync<H>(&mut self, mut handler: H) -> SearchResult<SyncReport>
    where
        H: FnMut(ChangeEvent) -> SearchResult<()> + Send,
    {
        if let Some(last) = self.last_sync
            && last.elapsed() < self.min_age
        {
            return Ok(SyncReport::skipped());
        }

        let wall_start = Utc::now();
        let start = Instant::now();
        let watermark = self.watermark.unwrap_or_default();

        // Wraps on overflow; only equality with the current sweep matters.
        // Advanced before scanning: every attempt, failed or not, gets its own tag.
        let next = self.generation.wrapping_add(1);
        self.generation = next;
        let before = self.num_entries();
        let mut report = SyncReport {
            before,
            ..SyncReport::default()
        };

        let collections = &mut self.collections;
        self.store
            .scan_since(watermark, |row| {
                report.entries += 1;
                let Some(reference) = parse_reference(&row, &mut report) else {
                    return Ok(());
                };
                let entries = collections.entry(reference.collection.clone()).or_default();

                match entries.entry(reference.id) {
                    Entry::Vacant(slot) => {
                        let payload = row.payload.unwrap_or_else(|| {
                            tracing::warn!(
                                reference = %reference,
                                "Unseen record returned without payload"
                            );
                            String::new()
                        });
                        handler(ChangeEvent::Added { reference, payload })?;
                        slot.insert(TrackingEntry {
                            updated_at: row.updated_at,
                            generation: next,
                        });
                        report.added += 1;
                    }
                    Entry::Occupied(mut slot) => {
                        if let Some(payload) = row.payload {
                            handler(ChangeEvent::Changed { reference, payload })?;
                            report.changed += 1;
                        } else {
                            report.unchanged += 1;
                        }
                        let entry = slot.get_mut();
                        entry.updated_at = row.updated_at;
                        entry.generation = next;
                    }
                }
                Ok(())
            })
            .await?;

        // Every previously cached entry was seen unchanged, so none can be stale.
        if report.unchanged != before {
            let stale: Vec<EntityRef> = self
                .collections
                .iter()
                .flat_map(|(name, entries)| {
                    entries
                        .iter()
                        .filter(|(_, entry)| entry.generation != next)
                        .map(|(id, _)| EntityRef::new(name.clone(), *id))
                })
                .collect();

            for reference in stale {
                if let Some(entries) = self.collections.get_mut(&reference.collection) {
                    entries.remove(&reference.id);
                }
                report.removed += 1;
                handler(ChangeEvent::Removed { reference })?;
            }
        }

        report.duration = start.elapsed();
        tracing::info!(
            entries = report.entries,
            before = report.before,
            added = report.added,
            changed = report.changed,
            unchanged = report.unchanged,
            removed = report.removed,
            malformed = report.malformed,
            duration_ms = report.duration.as_millis() as u64,
            "Source store diff finished"
        );

        self.watermark = Some(wall_start);
        self.last_sync = Some(start);
        Ok(report)
    }

    /// Number of records currently believed live
    #[must_use]
    pub fn num_entries(&self) -> usize {
        self.collections.values().map(|entries| entries.len()).sum()
    }

    /// Whether `reference` is currently tracked
    #[must_use]
    pub fn contains(&self, reference: &EntityRef) -> bool {
        self.collections
            .get(&reference.collection)
            .is_some_and(|entries| entries.contains_key(&reference.id))
    }

    /// Start time of the last successful scan
    #[must_use]
    pub fn watermark(&self) -> Option<DateTime<Utc>> {
        self.watermark
    }

    /// Tag of the most recent sweep, completed or not
    #[must_use]
    pub fn generation(&self) -> u16 {
        self.generation
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }
}
