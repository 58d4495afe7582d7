//! Full-text index over the source store, using Tantivy
//!
//! The index mirrors every free-text field of the schema descriptor. It is
//! rebuilt from scratch on start, kept current by diff scans of the store, and
//! queried through a coordinator that serializes refreshes and searches.

pub(crate) mod batch;
pub mod coordinator;
pub mod engine;
pub mod errors;
pub mod query;
pub mod runtime_helpers;
pub mod schema;
pub mod tokenizer;

pub use coordinator::{
    CoordinatorState, CoordinatorStats, CoordinatorStatsSnapshot, QueryCoordinator, QueryHandle,
    QueryReply,
};
pub use engine::IndexEngine;
pub use errors::{RetryConfig, SearchError, SearchResult};
pub use query::FUZZY_DISTANCE;
pub use runtime_helpers::retry_task;
pub use schema::{MappedField, SearchSchema, html_analyzer, text_analyzer};
pub use tokenizer::{HtmlStripTokenizer, strip_markup};
