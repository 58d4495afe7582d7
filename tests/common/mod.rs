//! Shared fixtures for the search daemon test suites

use std::time::Duration;

use kodegen_tools_searchd::{FieldKind, IndexEngine, MemoryStore, SchemaDescriptor, SearchConfig};
use tantivy::tokenizer::Language;
use tempfile::TempDir;

/// Minimum memory budget tantivy accepts for a writer
#[allow(dead_code)]
pub const WRITER_MEMORY: usize = 15_000_000;

/// `topic` with plain `title` and HTML `text`, `motion` with `title` and HTML `reason`
#[allow(dead_code)]
pub fn meeting_schema() -> SchemaDescriptor {
    SchemaDescriptor::builder()
        .collection("topic")
        .free_text("title", FieldKind::String)
        .free_text("text", FieldKind::HtmlStrict)
        .field("sequential_number", FieldKind::from("number"))
        .collection("motion")
        .free_text("title", FieldKind::String)
        .free_text("reason", FieldKind::HtmlPermissive)
        .build()
}

/// Config with an index under `dir`, no minimum sync age and English analysis
#[allow(dead_code)]
pub fn test_config(dir: &TempDir) -> SearchConfig {
    SearchConfig::builder()
        .index_path(dir.path().join("search.tantivy"))
        .min_sync_age(Duration::ZERO)
        .writer_memory(WRITER_MEMORY)
        .language(Language::English)
        .build()
        .expect("valid test config")
}

/// Engine over `store` with [`meeting_schema`], already built
#[allow(dead_code)]
pub async fn built_engine(dir: &TempDir, store: &MemoryStore) -> IndexEngine<MemoryStore> {
    let config = test_config(dir);
    let mut engine = IndexEngine::new(&config, &meeting_schema(), store.clone());
    engine.initial_build().await.expect("initial build");
    engine
}

/// Let the clock move past the last scan's watermark
#[allow(dead_code)]
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}

/// References rendered as `collection/id` strings
#[allow(dead_code)]
pub fn refs<T: ToString>(references: &[T]) -> Vec<String> {
    references.iter().map(ToString::to_string).collect()
}
