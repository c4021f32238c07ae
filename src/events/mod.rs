//! Lifecycle events and event handling.
//!
//! The tracker does not log on its own behalf. Instead it emits
//! [`LaunchEvent`]s to an [`EventBus`]; hosts register handlers such as
//! [`TracingHandler`] to turn them into logs or metrics.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

use crate::core::types::{LaunchId, LaunchState};

/// Lifecycle events emitted by the tracker.
#[derive(Debug, Clone)]
pub enum LaunchEvent {
    /// A launch was recorded.
    Launched {
        id: LaunchId,
        /// Initial state of the record (`Launched` or `Complete`).
        state: LaunchState,
        revision: u64,
        timestamp: Instant,
    },

    /// A launch replaced an existing record with the same id.
    Replaced {
        id: LaunchId,
        /// State of the record that was replaced.
        previous: LaunchState,
        timestamp: Instant,
    },

    /// A launched unit of work finished successfully.
    Completed { id: LaunchId, timestamp: Instant },

    /// A launched unit of work finished with an error.
    Failed {
        id: LaunchId,
        error: String,
        timestamp: Instant,
    },

    /// A launch was cancelled.
    Cancelled { id: LaunchId, timestamp: Instant },

    /// The store failed on a path that does not report errors to callers.
    StoreFailed {
        operation: &'static str,
        error: String,
        timestamp: Instant,
    },
}

impl LaunchEvent {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> Instant {
        match self {
            LaunchEvent::Launched { timestamp, .. } => *timestamp,
            LaunchEvent::Replaced { timestamp, .. } => *timestamp,
            LaunchEvent::Completed { timestamp, .. } => *timestamp,
            LaunchEvent::Failed { timestamp, .. } => *timestamp,
            LaunchEvent::Cancelled { timestamp, .. } => *timestamp,
            LaunchEvent::StoreFailed { timestamp, .. } => *timestamp,
        }
    }

    /// The launch id this event is about, if any.
    pub fn launch_id(&self) -> Option<&LaunchId> {
        match self {
            LaunchEvent::Launched { id, .. }
            | LaunchEvent::Replaced { id, .. }
            | LaunchEvent::Completed { id, .. }
            | LaunchEvent::Failed { id, .. }
            | LaunchEvent::Cancelled { id, .. } => Some(id),
            LaunchEvent::StoreFailed { .. } => None,
        }
    }

    /// Create a Launched event.
    pub fn launched(id: LaunchId, state: LaunchState, revision: u64) -> Self {
        LaunchEvent::Launched {
            id,
            state,
            revision,
            timestamp: Instant::now(),
        }
    }

    /// Create a Replaced event.
    pub fn replaced(id: LaunchId, previous: LaunchState) -> Self {
        LaunchEvent::Replaced {
            id,
            previous,
            timestamp: Instant::now(),
        }
    }

    /// Create a Completed event.
    pub fn completed(id: LaunchId) -> Self {
        LaunchEvent::Completed {
            id,
            timestamp: Instant::now(),
        }
    }

    /// Create a Failed event.
    pub fn failed(id: LaunchId, error: impl Into<String>) -> Self {
        LaunchEvent::Failed {
            id,
            error: error.into(),
            timestamp: Instant::now(),
        }
    }

    /// Create a Cancelled event.
    pub fn cancelled(id: LaunchId) -> Self {
        LaunchEvent::Cancelled {
            id,
            timestamp: Instant::now(),
        }
    }

    /// Create a StoreFailed event.
    pub fn store_failed(operation: &'static str, error: impl ToString) -> Self {
        LaunchEvent::StoreFailed {
            operation,
            error: error.to_string(),
            timestamp: Instant::now(),
        }
    }
}

/// Handler for receiving lifecycle events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an event.
    async fn handle(&self, event: &LaunchEvent);
}

/// Event bus for distributing events to registered handlers.
pub struct EventBus {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    /// Create a new event bus with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Register an event handler.
    pub async fn register(&self, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().await;
        handlers.push(handler);
    }

    /// Emit an event to all registered handlers.
    pub async fn emit(&self, event: LaunchEvent) {
        let handlers = self.handlers.read().await;
        for handler in handlers.iter() {
            handler.handle(&event).await;
        }
    }

    /// Get the number of registered handlers.
    pub async fn handler_count(&self) -> usize {
        self.handlers.read().await.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Event handler that writes every event to `tracing`.
pub struct TracingHandler;

#[async_trait]
impl EventHandler for TracingHandler {
    async fn handle(&self, event: &LaunchEvent) {
        match event {
            LaunchEvent::Launched {
                id,
                state,
                revision,
                ..
            } => {
                tracing::info!(launch_id = %id, state = %state, revision, "Launch recorded");
            }
            LaunchEvent::Replaced { id, previous, .. } => {
                tracing::debug!(launch_id = %id, previous = %previous, "Launch record replaced");
            }
            LaunchEvent::Completed { id, .. } => {
                tracing::info!(launch_id = %id, "Launch completed");
            }
            LaunchEvent::Failed { id, error, .. } => {
                tracing::warn!(launch_id = %id, error = %error, "Launch failed");
            }
            LaunchEvent::Cancelled { id, .. } => {
                tracing::info!(launch_id = %id, "Launch cancelled");
            }
            LaunchEvent::StoreFailed {
                operation, error, ..
            } => {
                tracing::error!(operation, error = %error, "Launch store failed");
            }
        }
    }
}
