//! Data model shared by the source store, the change tracker and the index

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::search::errors::SearchError;

/// Composite key of one record in the source store, serialized as `collection/id`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityRef {
    pub collection: String,
    pub id: u64,
}

impl EntityRef {
    #[must_use]
    pub fn new(collection: impl Into<String>, id: u64) -> Self {
        Self {
            collection: collection.into(),
            id,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

impl FromStr for EntityRef {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (collection, id) = s
            .split_once('/')
            .ok_or_else(|| SearchError::MalformedReference(format!("{s:?}")))?;
        if collection.is_empty() {
            return Err(SearchError::MalformedReference(format!(
                "{s:?}: empty collection"
            )));
        }
        let id = id
            .parse::<u64>()
            .map_err(|e| SearchError::MalformedReference(format!("{s:?}: {e}")))?;
        Ok(Self::new(collection, id))
    }
}

impl Serialize for EntityRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One row as delivered by a source store scan
///
/// `payload` is `None` on a diff scan when the row is still live but was not
/// modified since the watermark.
#[derive(Debug, Clone)]
pub struct SourceRow {
    pub reference: String,
    pub payload: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Kind of change observed for one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Changed,
    Removed,
}

/// Event delivered to the handler of a scan, in scan order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Added { reference: EntityRef, payload: String },
    Changed { reference: EntityRef, payload: String },
    Removed { reference: EntityRef },
}

impl ChangeEvent {
    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeEvent::Added { .. } => ChangeKind::Added,
            ChangeEvent::Changed { .. } => ChangeKind::Changed,
            ChangeEvent::Removed { .. } => ChangeKind::Removed,
        }
    }

    #[must_use]
    pub fn reference(&self) -> &EntityRef {
        match self {
            ChangeEvent::Added { reference, .. }
            | ChangeEvent::Changed { reference, .. }
            | ChangeEvent::Removed { reference } => reference,
        }
    }
}

/// Cache entry for one live record
///
/// An entry whose `generation` differs from the generation of the last
/// completed sweep was not observed and is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingEntry {
    pub updated_at: DateTime<Utc>,
    pub generation: u16,
}

/// Counters of one scan, logged and returned to the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Sync was skipped because the last one is younger than the minimum age
    pub skipped: bool,
    /// Rows delivered by the store
    pub entries: usize,
    /// Cached entries before the scan
    pub before: usize,
    pub added: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub removed: usize,
    /// Rows dropped because their reference did not parse
    pub malformed: usize,
    pub duration: Duration,
}

impl SyncReport {
    pub(crate) fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    /// Number of events emitted by the scan
    #[must_use]
    pub fn events(&self) -> usize {
        self.added + self.changed + self.removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reference() {
        let r: EntityRef = "topic/42".parse().unwrap();
        assert_eq!(r, EntityRef::new("topic", 42));
        assert_eq!(r.to_string(), "topic/42");
    }

    #[test]
    fn test_parse_malformed_references() {
        for bad in ["topic", "topic/", "/5", "topic/x", "topic/1/2", "topic/-3"] {
            let err = bad.parse::<EntityRef>().unwrap_err();
            assert!(
                matches!(err, SearchError::MalformedReference(_)),
                "{bad} should be malformed, got {err:?}"
            );
        }
    }

    #[test]
    fn test_reference_serializes_as_string() {
        let json = serde_json::to_string(&vec![EntityRef::new("motion", 7)]).unwrap();
        assert_eq!(json, r#"["motion/7"]"#);
    }
}
