//! Schema descriptor types
//!
//! A [`SchemaDescriptor`] lists, per collection, the ordered fields of the
//! records in the source store together with their kind and whether they are
//! indexed for full-text search. It is resolved once and stays immutable for
//! the lifetime of an index.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared kind of a schema field
///
/// Only the text-like kinds are indexable; anything else is carried through
/// as [`FieldKind::Other`] so the index can report and skip it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldKind {
    String,
    Text,
    HtmlStrict,
    HtmlPermissive,
    Other(String),
}

impl FieldKind {
    /// Whether values of this kind carry HTML markup
    #[must_use]
    pub fn is_html(&self) -> bool {
        matches!(self, FieldKind::HtmlStrict | FieldKind::HtmlPermissive)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            FieldKind::String => "string",
            FieldKind::Text => "text",
            FieldKind::HtmlStrict => "HTMLStrict",
            FieldKind::HtmlPermissive => "HTMLPermissive",
            FieldKind::Other(kind) => kind,
        }
    }
}

impl From<&str> for FieldKind {
    fn from(kind: &str) -> Self {
        match kind {
            "string" => FieldKind::String,
            "text" => FieldKind::Text,
            "HTMLStrict" => FieldKind::HtmlStrict,
            "HTMLPermissive" => FieldKind::HtmlPermissive,
            other => FieldKind::Other(other.to_string()),
        }
    }
}

impl From<String> for FieldKind {
    fn from(kind: String) -> Self {
        FieldKind::from(kind.as_str())
    }
}

impl From<FieldKind> for String {
    fn from(kind: FieldKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field of a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    /// Indexed for full-text search
    pub free_text: bool,
    /// Position assigned while loading; unique across the whole descriptor
    pub order: u32,
}

/// One collection and its fields, in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub name: String,
    pub order: u32,
    pub fields: Vec<FieldSpec>,
}

impl CollectionSpec {
    /// Fields eligible for full-text indexing
    pub fn free_text_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|field| field.free_text)
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Collection name to ordered field list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDescriptor {
    pub(crate) collections: Vec<CollectionSpec>,
}

impl SchemaDescriptor {
    #[must_use]
    pub fn collection(&self, name: &str) -> Option<&CollectionSpec> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// Collections in load order
    pub fn collections(&self) -> impl Iterator<Item = &CollectionSpec> {
        self.collections.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

/// Source of the schema the index is built from
pub trait SchemaProvider {
    fn schema(&self) -> &SchemaDescriptor;
}

impl SchemaProvider for SchemaDescriptor {
    fn schema(&self) -> &SchemaDescriptor {
        self
    }
}
