//! Getter methods for `SearchConfig` and `DatabaseConfig`

use std::path::Path;
use std::time::Duration;
use tantivy::tokenizer::Language;

use super::types::{DatabaseConfig, SearchConfig};

impl SearchConfig {
    #[must_use]
    pub fn max_queued(&self) -> usize {
        self.max_queued
    }

    #[must_use]
    pub fn min_sync_age(&self) -> Duration {
        self.min_sync_age
    }

    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    #[must_use]
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Heap budget handed to the tantivy index writer
    #[must_use]
    pub fn writer_memory(&self) -> usize {
        self.writer_memory
    }

    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }

    #[must_use]
    pub fn schema_file(&self) -> &Path {
        &self.schema_file
    }

    #[must_use]
    pub fn database(&self) -> &DatabaseConfig {
        &self.database
    }
}

impl DatabaseConfig {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }
}
