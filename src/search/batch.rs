//! Staging of change events into index writer batches
//!
//! `BatchSink` turns Added/Changed/Removed events into tantivy user
//! operations and hands them to the writer in groups of `batch_size` events.
//! Operations of one group get contiguous opstamps, so the delete issued for a
//! changed record always lands before its re-insert. Nothing becomes visible
//! to searchers until [`BatchSink::commit`].

use serde_json::Value;
use tantivy::indexer::UserOperation;
use tantivy::{IndexWriter, TantivyDocument, Term};

use super::errors::{SearchError, SearchResult};
use super::schema::{MappedField, SearchSchema};
use crate::store::{ChangeEvent, EntityRef};

pub(crate) struct BatchSink<'a> {
    mapping: &'a SearchSchema,
    writer: &'a mut IndexWriter,
    ops: Vec<UserOperation>,
    pending: usize,
    batch_size: usize,
    pub(crate) flushes: usize,
    pub(crate) staged: usize,
}

impl<'a> BatchSink<'a> {
    pub(crate) fn new(mapping: &'a SearchSchema, writer: &'a mut IndexWriter, batch_size: usize) -> Self {
        Self {
            mapping,
            writer,
            ops: Vec::with_capacity(batch_size.min(4096) * 2),
            pending: 0,
            batch_size: batch_size.max(1),
            flushes: 0,
            staged: 0,
        }
    }

    /// Stage one event; flushes once `batch_size` events are pending
    ///
    /// Events of collections the schema does not know are ignored.
    pub(crate) fn apply(&mut self, event: ChangeEvent) -> SearchResult<()> {
        let mapping = self.mapping;
        let Some(fields) = mapping.collection(&event.reference().collection) else {
            return Ok(());
        };

        match event {
            ChangeEvent::Added { reference, payload } => {
                let doc = build_document(mapping, fields, &reference, &payload);
                self.ops.push(UserOperation::Add(doc));
            }
            ChangeEvent::Changed { reference, payload } => {
                // The payload is complete, so the old document is replaced wholesale.
                let term = reference_term(mapping, &reference);
                self.ops.push(UserOperation::Delete(term));
                let doc = build_document(mapping, fields, &reference, &payload);
                self.ops.push(UserOperation::Add(doc));
            }
            ChangeEvent::Removed { reference } => {
                let term = reference_term(mapping, &reference);
                self.ops.push(UserOperation::Delete(term));
            }
        }

        self.pending += 1;
        self.staged += 1;
        if self.pending >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Hand every staged operation to the writer
    pub(crate) fn flush(&mut self) -> SearchResult<()> {
        if self.ops.is_empty() {
            return Ok(());
        }
        let ops = std::mem::take(&mut self.ops);
        let count = ops.len();
        self.writer
            .run(ops)
            .map_err(|e| SearchError::IndexWrite(format!("Failed to apply batch: {e}")))?;
        self.pending = 0;
        self.flushes += 1;
        tracing::debug!(operations = count, flushes = self.flushes, "Flushed index batch");
        Ok(())
    }

    /// Flush the remainder and commit everything handed to the writer
    pub(crate) fn commit(mut self) -> SearchResult<BatchSummary> {
        self.flush()?;
        self.writer
            .commit()
            .map_err(|e| SearchError::IndexWrite(format!("Index commit failed: {e}")))?;
        Ok(BatchSummary {
            staged: self.staged,
            flushes: self.flushes,
        })
    }
}

fn reference_term(mapping: &SearchSchema, reference: &EntityRef) -> Term {
    Term::from_field_text(mapping.reference_field(), &reference.to_string())
}

/// Counters of one committed sink
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct BatchSummary {
    pub staged: usize,
    pub flushes: usize,
}

/// Document for one record, holding only mapped fields with string values
pub(crate) fn build_document(
    mapping: &SearchSchema,
    fields: &[MappedField],
    reference: &EntityRef,
    payload: &str,
) -> TantivyDocument {
    let mut doc = TantivyDocument::default();
    doc.add_text(mapping.reference_field(), reference.to_string());

    if fields.is_empty() {
        return doc;
    }

    let record: Value = match serde_json::from_str(payload) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(
                reference = %reference,
                error = %e,
                "Payload is not valid JSON, indexing reference only"
            );
            return doc;
        }
    };

    for mapped in fields {
        if let Some(text) = record.get(&mapped.name).and_then(Value::as_str) {
            doc.add_text(mapped.field, text);
        }
    }
    doc
}
