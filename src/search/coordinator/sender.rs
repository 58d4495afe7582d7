//! Gateway-facing handle of the query coordinator
//!
//! `QueryHandle` is cheap to clone and safe to use from any task. Admission is
//! non-blocking: a full queue rejects the submission on the spot.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use super::stats::{CoordinatorStats, CoordinatorStatsSnapshot};
use super::types::{CoordinatorState, QueryReply, QueryRequest};
use crate::search::errors::SearchError;

#[derive(Clone)]
pub struct QueryHandle {
    pub(super) sender: mpsc::Sender<QueryRequest>,
    pub(super) stats: Arc<CoordinatorStats>,
}

impl std::fmt::Debug for QueryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryHandle")
            .field("queued", &self.queued())
            .field("state", &self.stats.state())
            .finish()
    }
}

impl QueryHandle {
    /// Queue a query and wait for its result
    ///
    /// The text is not validated; rejecting empty queries is up to the caller.
    ///
    /// # Errors
    ///
    /// `QueueFull` immediately when the queue is at capacity,
    /// `ServiceStopped` when the coordinator is gone, otherwise whatever the
    /// refresh or the search that served the query returned.
    pub async fn submit(&self, text: impl Into<String>) -> QueryReply {
        let (reply, rx) = oneshot::channel();
        let request = QueryRequest {
            text: text.into(),
            reply,
        };

        match self.sender.try_send(request) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                CoordinatorStats::incr(&self.stats.rejected);
                tracing::debug!(capacity = self.capacity(), "Rejected query, queue full");
                return Err(SearchError::QueueFull);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => return Err(SearchError::ServiceStopped),
        }

        rx.await.map_err(|_| SearchError::ServiceStopped)?
    }

    /// Queries currently waiting in the queue
    #[must_use]
    pub fn queued(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    #[must_use]
    pub fn state(&self) -> CoordinatorState {
        self.stats.state()
    }

    #[must_use]
    pub fn stats(&self) -> CoordinatorStatsSnapshot {
        self.stats.snapshot()
    }
}
