//! Building and loading schema descriptors
//!
//! Collections and fields get their `order` from an [`OrderCounter`] that the
//! caller owns and passes into every load, so several files loaded in turn
//! share one deterministic ordering.
//!
//! The JSON format is a list of collections:
//!
//! ```json
//! [
//!   {
//!     "collection": "topic",
//!     "fields": [
//!       { "name": "title", "type": "string", "searchable": true },
//!       { "name": "text", "type": "HTMLStrict", "searchable": true },
//!       { "name": "sequential_number", "type": "number" }
//!     ]
//!   }
//! ]
//! ```

use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use super::types::{CollectionSpec, FieldKind, FieldSpec, SchemaDescriptor};
use crate::search::errors::{SearchError, SearchResult};

/// Hands out increasing positions for collections and fields
#[derive(Debug, Clone, Default)]
pub struct OrderCounter {
    next: u32,
}

impl OrderCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next position
    pub fn next_order(&mut self) -> u32 {
        self.next += 1;
        self.next
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCollection {
    collection: String,
    #[serde(default)]
    fields: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawField {
    name: String,
    #[serde(rename = "type")]
    kind: FieldKind,
    #[serde(default)]
    searchable: bool,
}

impl SchemaDescriptor {
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new(OrderCounter::new())
    }

    /// Parse a JSON schema, assigning order from `counter`
    ///
    /// # Errors
    ///
    /// Returns `SearchError::Schema` when the input is not valid schema JSON
    /// or declares a collection, or a field within one collection, twice.
    pub fn from_reader<R: Read>(reader: R, counter: &mut OrderCounter) -> SearchResult<Self> {
        let raw: Vec<RawCollection> = serde_json::from_reader(reader)
            .map_err(|e| SearchError::Schema(format!("parsing schema: {e}")))?;

        let mut collections: Vec<CollectionSpec> = Vec::with_capacity(raw.len());
        for entry in raw {
            if entry.collection.is_empty() || entry.collection.contains('/') {
                return Err(SearchError::Schema(format!(
                    "invalid collection name {:?}",
                    entry.collection
                )));
            }
            if collections.iter().any(|c| c.name == entry.collection) {
                return Err(SearchError::Schema(format!(
                    "collection {:?} declared twice",
                    entry.collection
                )));
            }

            for (i, field) in entry.fields.iter().enumerate() {
                if entry.fields[..i].iter().any(|f| f.name == field.name) {
                    return Err(SearchError::Schema(format!(
                        "field {:?} declared twice in collection {:?}",
                        field.name, entry.collection
                    )));
                }
            }

            let order = counter.next_order();
            let fields = entry
                .fields
                .into_iter()
                .map(|field| FieldSpec {
                    name: field.name,
                    kind: field.kind,
                    free_text: field.searchable,
                    order: counter.next_order(),
                })
                .collect();

            collections.push(CollectionSpec {
                name: entry.collection,
                order,
                fields,
            });
        }

        Ok(Self { collections })
    }

    /// Load a JSON schema file
    ///
    /// # Errors
    ///
    /// Returns `SearchError::Schema` when the file cannot be opened or does
    /// not parse.
    pub fn load(path: &Path, counter: &mut OrderCounter) -> SearchResult<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            SearchError::Schema(format!("opening schema file {}: {e}", path.display()))
        })?;
        let schema = Self::from_reader(std::io::BufReader::new(file), counter)?;
        tracing::info!(
            path = %path.display(),
            collections = schema.len(),
            "Loaded schema descriptor"
        );
        Ok(schema)
    }
}

/// Fluent construction of a [`SchemaDescriptor`]
///
/// ```
/// use kodegen_tools_searchd::model::{FieldKind, SchemaDescriptor};
///
/// let schema = SchemaDescriptor::builder()
///     .collection("topic")
///     .free_text("title", FieldKind::String)
///     .field("sequential_number", FieldKind::from("number"))
///     .build();
/// assert_eq!(schema.collection("topic").unwrap().free_text_fields().count(), 1);
/// ```
#[derive(Debug)]
pub struct SchemaBuilder {
    counter: OrderCounter,
    collections: Vec<CollectionSpec>,
}

impl SchemaBuilder {
    /// Start a builder that draws positions from `counter`
    #[must_use]
    pub fn new(counter: OrderCounter) -> Self {
        Self {
            counter,
            collections: Vec::new(),
        }
    }

    /// Open a new collection; following fields are added to it
    #[must_use]
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        let order = self.counter.next_order();
        self.collections.push(CollectionSpec {
            name: name.into(),
            order,
            fields: Vec::new(),
        });
        self
    }

    /// Add a field indexed for full-text search
    #[must_use]
    pub fn free_text(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.push_field(name.into(), kind, true)
    }

    /// Add a field that is part of the record but not searchable
    #[must_use]
    pub fn field(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.push_field(name.into(), kind, false)
    }

    fn push_field(mut self, name: String, kind: FieldKind, free_text: bool) -> Self {
        let order = self.counter.next_order();
        if let Some(collection) = self.collections.last_mut() {
            collection.fields.push(FieldSpec {
                name,
                kind,
                free_text,
                order,
            });
        } else {
            tracing::warn!(field = %name, "Field declared before any collection, ignoring");
        }
        self
    }

    #[must_use]
    pub fn build(self) -> SchemaDescriptor {
        SchemaDescriptor {
            collections: self.collections,
        }
    }

    /// Finish and hand the counter back for further loads
    #[must_use]
    pub fn build_with_counter(self) -> (SchemaDescriptor, OrderCounter) {
        (
            SchemaDescriptor {
                collections: self.collections,
            },
            self.counter,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA_JSON: &str = r#"[
        {
            "collection": "topic",
            "fields": [
                { "name": "title", "type": "string", "searchable": true },
                { "name": "text", "type": "HTMLStrict", "searchable": true },
                { "name": "sequential_number", "type": "number" }
            ]
        },
        {
            "collection": "motion",
            "fields": [
                { "name": "title", "type": "string", "searchable": true },
                { "name": "reason", "type": "HTMLPermissive", "searchable": true }
            ]
        }
    ]"#;

    #[test]
    fn test_from_reader_keeps_declaration_order() {
        let mut counter = OrderCounter::new();
        let schema = SchemaDescriptor::from_reader(SCHEMA_JSON.as_bytes(), &mut counter).unwrap();

        let names: Vec<&str> = schema.collections().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["topic", "motion"]);

        let topic = schema.collection("topic").unwrap();
        assert_eq!(topic.fields.len(), 3);
        assert_eq!(topic.fields[1].kind, FieldKind::HtmlStrict);
        assert_eq!(topic.fields[2].kind, FieldKind::Other("number".into()));
        assert!(!topic.fields[2].free_text);
        assert!(topic.fields.windows(2).all(|w| w[0].order < w[1].order));
    }

    #[test]
    fn test_counter_is_shared_between_loads() {
        let mut counter = OrderCounter::new();
        let first = SchemaDescriptor::from_reader(SCHEMA_JSON.as_bytes(), &mut counter).unwrap();
        let extra = r#"[{ "collection": "assignment", "fields": [
            { "name": "title", "type": "string", "searchable": true }
        ]}]"#;
        let second = SchemaDescriptor::from_reader(extra.as_bytes(), &mut counter).unwrap();

        let last_of_first = first.collections().flat_map(|c| &c.fields).map(|f| f.order).max();
        let first_of_second = second.collection("assignment").unwrap().order;
        assert!(Some(first_of_second) > last_of_first);
    }

    #[test]
    fn test_duplicate_collection_is_rejected() {
        let json = r#"[{ "collection": "topic" }, { "collection": "topic" }]"#;
        let err = SchemaDescriptor::from_reader(json.as_bytes(), &mut OrderCounter::new()).unwrap_err();
        assert!(matches!(err, SearchError::Schema(_)));
    }

    #[test]
    fn test_duplicate_field_is_rejected() {
        let json = r#"[{ "collection": "topic", "fields": [
            { "name": "title", "type": "string", "searchable": true },
            { "name": "title", "type": "text", "searchable": true }
        ]}]"#;
        let err = SchemaDescriptor::from_reader(json.as_bytes(), &mut OrderCounter::new()).unwrap_err();
        assert!(matches!(err, SearchError::Schema(ref msg) if msg.contains("title")), "{err:?}");
    }

    #[test]
    fn test_same_field_name_in_two_collections_is_fine() {
        let json = r#"[
            { "collection": "topic", "fields": [{ "name": "title", "type": "string", "searchable": true }] },
            { "collection": "motion", "fields": [{ "name": "title", "type": "string", "searchable": true }] }
        ]"#;
        let schema = SchemaDescriptor::from_reader(json.as_bytes(), &mut OrderCounter::new()).unwrap();
        assert_eq!(schema.len(), 2);
    }

    #[test]
    fn test_builder_assigns_fields_to_last_collection() {
        let schema = SchemaDescriptor::builder()
            .collection("topic")
            .free_text("title", FieldKind::String)
            .collection("motion")
            .free_text("text", FieldKind::HtmlPermissive)
            .field("state_id", FieldKind::from("relation"))
            .build();

        assert_eq!(schema.collection("topic").unwrap().fields.len(), 1);
        let motion = schema.collection("motion").unwrap();
        assert_eq!(motion.free_text_fields().count(), 1);
        assert!(motion.field("text").unwrap().kind.is_html());
    }
}
