//! Schema model of the mirrored records
//!
//! The schema is resolved before the index is built: which collections exist,
//! which of their fields are free text, and which analyzer kind each field
//! declares.

pub mod loader;
pub mod types;

pub use loader::{OrderCounter, SchemaBuilder};
pub use types::{CollectionSpec, FieldKind, FieldSpec, SchemaDescriptor, SchemaProvider};
