//! Core configuration types for the search daemon
//!
//! `SearchConfig` holds every tunable of the sync/index/query pipeline and
//! `DatabaseConfig` the connection parameters of the source store.

use std::path::PathBuf;
use std::time::Duration;
use tantivy::tokenizer::Language;

/// Maximum number of queries waiting for the coordinator
pub const DEFAULT_MAX_QUEUED: usize = 5;

/// Minimum time between two diff scans
pub const DEFAULT_MIN_SYNC_AGE: Duration = Duration::from_millis(100);

/// Period of the background refresh
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(120);

/// Documents staged before a batch is flushed
pub const DEFAULT_BATCH_SIZE: usize = 4096;

/// Upper bound on hits collected per query
pub const DEFAULT_MAX_RESULTS: usize = 100;

/// Index writer heap budget: 50 MB
pub const DEFAULT_WRITER_MEMORY: usize = 50_000_000;

pub const DEFAULT_INDEX_PATH: &str = "search.tantivy";
pub const DEFAULT_SCHEMA_FILE: &str = "search-schema.json";
pub const DEFAULT_SECRETS_DIR: &str = "/run/secrets";

/// Connection parameters of the Postgres source store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub(crate) name: String,
    pub(crate) user: String,
    pub(crate) password: String,
    pub(crate) host: String,
    pub(crate) port: u16,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: "openslides".to_string(),
            user: "openslides".to_string(),
            password: "openslides".to_string(),
            host: "localhost".to_string(),
            port: 5432,
        }
    }
}

/// Main configuration struct of the search daemon
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Capacity of the query queue; submissions beyond it fail fast
    pub(crate) max_queued: usize,
    /// Diff scans are skipped while the last one is younger than this
    pub(crate) min_sync_age: Duration,
    pub(crate) refresh_interval: Duration,
    /// Directory of the on-disk index; wiped on every initial build
    pub(crate) index_path: PathBuf,
    pub(crate) batch_size: usize,
    pub(crate) max_results: usize,
    pub(crate) writer_memory: usize,
    /// Stop-word list and stemmer language of the text analyzers
    pub(crate) language: Language,
    pub(crate) schema_file: PathBuf,
    pub(crate) database: DatabaseConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_queued: DEFAULT_MAX_QUEUED,
            min_sync_age: DEFAULT_MIN_SYNC_AGE,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            index_path: PathBuf::from(DEFAULT_INDEX_PATH),
            batch_size: DEFAULT_BATCH_SIZE,
            max_results: DEFAULT_MAX_RESULTS,
            writer_memory: DEFAULT_WRITER_MEMORY,
            language: Language::German,
            schema_file: PathBuf::from(DEFAULT_SCHEMA_FILE),
            database: DatabaseConfig::default(),
        }
    }
}
