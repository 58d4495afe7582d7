//! Single-owner coordination loop over the index engine
//!
//! The loop is the only place the engine is touched after the initial build.
//! Each iteration handles exactly one of: cancellation, a refresh tick, or one
//! queued query. A query always refreshes first, so results are never staler
//! than the last completed iteration; if that refresh fails the query fails
//! with the same error instead of searching a stale index.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::sender::QueryHandle;
use super::stats::CoordinatorStats;
use super::types::{CoordinatorState, QueryRequest};
use crate::config::SearchConfig;
use crate::search::engine::IndexEngine;
use crate::search::errors::SearchError;
use crate::store::SourceStore;

pub struct QueryCoordinator<S> {
    engine: IndexEngine<S>,
    receiver: mpsc::Receiver<QueryRequest>,
    shutdown: watch::Receiver<bool>,
    refresh_interval: Duration,
    stats: Arc<CoordinatorStats>,
}

impl<S: SourceStore + 'static> QueryCoordinator<S> {
    /// Take ownership of a built engine; the loop starts with [`Self::run`]
    ///
    /// Setting `shutdown` to `true` (or dropping its sender) stops the loop
    /// after the iteration in flight.
    pub fn new(
        engine: IndexEngine<S>,
        config: &SearchConfig,
        shutdown: watch::Receiver<bool>,
    ) -> (Self, QueryHandle) {
        let (sender, receiver) = mpsc::channel(config.max_queued());
        let stats = Arc::new(CoordinatorStats::new());

        let coordinator = Self {
            engine,
            receiver,
            shutdown,
            refresh_interval: config.refresh_interval(),
            stats: stats.clone(),
        };
        (coordinator, QueryHandle { sender, stats })
    }

    /// Run the loop on its own task; the task yields the engine back on exit
    pub fn spawn(self) -> JoinHandle<IndexEngine<S>> {
        tokio::spawn(self.run())
    }

    /// Run until cancelled, then hand the engine back for closing
    pub async fn run(mut self) -> IndexEngine<S> {
        let mut ticker = tokio::time::interval_at(
            Instant::now() + self.refresh_interval,
            self.refresh_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut accepting = true;

        self.stats.set_state(CoordinatorState::Running);
        tracing::info!(
            refresh_interval_ms = self.refresh_interval.as_millis() as u64,
            capacity = self.receiver.max_capacity(),
            "Query coordinator running"
        );

        loop {
            tokio::select! {
                biased;

                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    // Failures are logged and counted; the next tick retries.
                    let _ = self.refresh("timer").await;
                }
                request = self.receiver.recv(), if accepting => {
                    match request {
                        Some(request) => self.serve(request).await,
                        // Every handle is gone; keep refreshing until cancelled.
                        None => accepting = false,
                    }
                }
            }
        }

        self.stats.set_state(CoordinatorState::ShuttingDown);
        self.receiver.close();
        let mut abandoned = 0usize;
        while let Ok(request) = self.receiver.try_recv() {
            let _ = request.reply.send(Err(SearchError::ServiceStopped));
            abandoned += 1;
        }

        self.stats.set_state(CoordinatorState::Stopped);
        tracing::info!(abandoned, "Query coordinator stopped");
        self.engine
    }

    /// Refresh the index, logging and counting failures
    async fn refresh(&mut self, trigger: &'static str) -> Result<(), SearchError> {
        match self.engine.refresh().await {
            Ok(report) => {
                if !report.skipped {
                    CoordinatorStats::incr(&self.stats.refreshes);
                }
                Ok(())
            }
            Err(e) => {
                CoordinatorStats::incr(&self.stats.refresh_failures);
                tracing::error!(trigger, error = %e, "Index refresh failed");
                Err(e)
            }
        }
    }

    async fn serve(&mut self, request: QueryRequest) {
        let QueryRequest { text, reply } = request;

        let result = match self.refresh("query").await {
            Ok(()) => self.engine.search(&text),
            Err(e) => Err(e),
        };

        match &result {
            Ok(references) => {
                CoordinatorStats::incr(&self.stats.served);
                tracing::debug!(query = %text, results = references.len(), "Served query");
            }
            Err(e) => {
                CoordinatorStats::incr(&self.stats.failed);
                tracing::warn!(query = %text, error = %e, "Query failed");
            }
        }

        if reply.send(result).is_err() {
            tracing::debug!("Query caller went away before the result was ready");
        }
    }
}
