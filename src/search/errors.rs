//! Error types for synchronization, indexing and query operations
//!
//! This module defines the single error type shared by the change tracker,
//! the index engine and the query coordinator, together with the retry
//! configuration used for transient index-writer failures.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Error types for search operations
#[derive(Debug, Error)]
pub enum SearchError {
    /// Source store could not be reached
    #[error("Failed to connect to source store: {0}")]
    Connection(String),

    /// Source store query or row decoding failed
    #[error("Source store query failed: {0}")]
    Query(String),

    /// Entity reference is not of the form `collection/id`
    #[error("Invalid entity reference: {0}")]
    MalformedReference(String),

    /// Index store could not be (re)created
    #[error("Failed to build search index: {0}")]
    IndexBuild(String),

    /// Staged batch could not be written or committed
    #[error("Failed to write search index: {0}")]
    IndexWrite(String),

    /// Index writer acquisition failed (transient)
    #[error("Failed to acquire index writer (retry recommended): {0}")]
    WriterAcquisition(String),

    /// Search execution failed
    #[error("Search execution failed: {0}")]
    SearchExecution(String),

    /// Engine used after `close`
    #[error("Search index is closed")]
    IndexClosed,

    /// Query queue is at capacity
    #[error("query queue full")]
    QueueFull,

    /// Query coordinator is no longer running
    #[error("Query coordinator stopped")]
    ServiceStopped,

    /// Schema descriptor could not be loaded
    #[error("Invalid schema: {0}")]
    Schema(String),

    /// Configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for SearchError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Configuration(_) => SearchError::Connection(error.to_string()),
            other => SearchError::Query(other.to_string()),
        }
    }
}

impl SearchError {
    /// Check if error is transient and should be retried
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, SearchError::WriterAcquisition(_) | SearchError::Io(_))
    }

    /// Get suggested retry delay for transient errors
    #[must_use]
    pub fn retry_delay(&self) -> Option<Duration> {
        if self.is_transient() {
            Some(Duration::from_millis(100))
        } else {
            None
        }
    }

    /// Whether the error came from talking to the source store
    #[must_use]
    pub fn is_store_error(&self) -> bool {
        matches!(self, SearchError::Connection(_) | SearchError::Query(_))
    }
}

/// Retry configuration for index writer acquisition
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_attempts: u32,
    /// Initial retry delay
    pub initial_delay: Duration,
    /// Backoff multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Maximum retry delay
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Calculate delay for given attempt number (0-based)
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = self.backoff_multiplier.powi(attempt as i32);
        let delay_ms = (self.initial_delay.as_millis() as f64 * multiplier) as u64;

        Duration::from_millis(delay_ms).min(self.max_delay)
    }
}
