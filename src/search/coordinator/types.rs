//! Message types and lifecycle states of the query coordinator

use tokio::sync::oneshot;

use crate::search::errors::SearchResult;
use crate::store::EntityRef;

/// Result delivered to a submitting caller
pub type QueryReply = SearchResult<Vec<EntityRef>>;

/// One query waiting in the coordinator's queue
#[derive(Debug)]
pub struct QueryRequest {
    pub text: String,
    pub reply: oneshot::Sender<QueryReply>,
}

/// Lifecycle of the coordination loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CoordinatorState {
    /// Constructed, loop not yet running
    Idle = 0,
    Running = 1,
    /// Cancellation observed; failing whatever is still queued
    ShuttingDown = 2,
    Stopped = 3,
}

impl CoordinatorState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => CoordinatorState::Idle,
            1 => CoordinatorState::Running,
            2 => CoordinatorState::ShuttingDown,
            _ => CoordinatorState::Stopped,
        }
    }
}
