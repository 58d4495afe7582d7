//! Query coordinator: serialized refresh and search under bounded admission
//!
//! # Architecture
//!
//! - `types` - Query request, reply and lifecycle state
//! - `stats` - Lock-free counters shared with every handle
//! - `sender` - `QueryHandle`, the non-blocking `submit` API
//! - `service` - The single-owner loop over the index engine
//!
//! # Example
//!
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let (coordinator, handle) = QueryCoordinator::new(engine, &config, shutdown_rx);
//! let task = coordinator.spawn();
//!
//! let references = handle.submit("budget").await?;
//!
//! shutdown_tx.send(true)?;
//! let mut engine = task.await?;
//! engine.close().await?;
//! ```

mod sender;
mod service;
mod stats;
mod types;

pub use sender::QueryHandle;
pub use service::QueryCoordinator;
pub use stats::{CoordinatorStats, CoordinatorStatsSnapshot};
pub use types::{CoordinatorState, QueryReply, QueryRequest};
