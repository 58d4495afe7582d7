//! Fluent builder for `SearchConfig`
//!
//! Every field has a default, so the builder can be built right away.
//! `build()` rejects values the pipeline cannot run with.

use std::path::PathBuf;
use std::time::Duration;
use tantivy::tokenizer::Language;

use super::types::{DatabaseConfig, SearchConfig};
use crate::search::errors::{SearchError, SearchResult};

/// tantivy refuses writer budgets below 15 MB
const MIN_WRITER_MEMORY: usize = 15_000_000;

#[derive(Debug, Clone, Default)]
pub struct SearchConfigBuilder {
    pub(crate) config: SearchConfig,
}

impl SearchConfig {
    /// Create a builder for configuring a `SearchConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> SearchConfigBuilder {
        SearchConfigBuilder::default()
    }
}

impl SearchConfigBuilder {
    #[must_use]
    pub fn max_queued(mut self, max_queued: usize) -> Self {
        self.config.max_queued = max_queued;
        self
    }

    #[must_use]
    pub fn min_sync_age(mut self, age: Duration) -> Self {
        self.config.min_sync_age = age;
        self
    }

    #[must_use]
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.config.refresh_interval = interval;
        self
    }

    #[must_use]
    pub fn index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.index_path = path.into();
        self
    }

    /// Number of staged documents that triggers a flush
    #[must_use]
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    #[must_use]
    pub fn max_results(mut self, max_results: usize) -> Self {
        self.config.max_results = max_results;
        self
    }

    #[must_use]
    pub fn writer_memory(mut self, bytes: usize) -> Self {
        self.config.writer_memory = bytes;
        self
    }

    #[must_use]
    pub fn language(mut self, language: Language) -> Self {
        self.config.language = language;
        self
    }

    #[must_use]
    pub fn schema_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.schema_file = path.into();
        self
    }

    #[must_use]
    pub fn database(mut self, database: DatabaseConfig) -> Self {
        self.config.database = database;
        self
    }

    #[must_use]
    pub fn db_name(mut self, name: impl Into<String>) -> Self {
        self.config.database.name = name.into();
        self
    }

    #[must_use]
    pub fn db_user(mut self, user: impl Into<String>) -> Self {
        self.config.database.user = user.into();
        self
    }

    #[must_use]
    pub fn db_password(mut self, password: impl Into<String>) -> Self {
        self.config.database.password = password.into();
        self
    }

    #[must_use]
    pub fn db_host(mut self, host: impl Into<String>) -> Self {
        self.config.database.host = host.into();
        self
    }

    #[must_use]
    pub fn db_port(mut self, port: u16) -> Self {
        self.config.database.port = port;
        self
    }

    /// Validate and produce the configuration
    ///
    /// # Errors
    ///
    /// Returns `SearchError::Config` when a size is zero, the refresh
    /// interval is zero, or the writer budget is below tantivy's minimum.
    pub fn build(self) -> SearchResult<SearchConfig> {
        let config = self.config;

        if config.max_queued == 0 {
            return Err(SearchError::Config("max_queued must be at least 1".into()));
        }
        if config.batch_size == 0 {
            return Err(SearchError::Config("batch_size must be at least 1".into()));
        }
        if config.max_results == 0 {
            return Err(SearchError::Config("max_results must be at least 1".into()));
        }
        if config.refresh_interval.is_zero() {
            return Err(SearchError::Config(
                "refresh_interval must be greater than zero".into(),
            ));
        }
        if config.writer_memory < MIN_WRITER_MEMORY {
            return Err(SearchError::Config(format!(
                "writer_memory must be at least {MIN_WRITER_MEMORY} bytes, got {}",
                config.writer_memory
            )));
        }
        if config.index_path.as_os_str().is_empty() {
            return Err(SearchError::Config("index_path must not be empty".into()));
        }

        Ok(config)
    }
}
