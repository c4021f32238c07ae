//! Testing utilities for users of the tasklaunch library.
//!
//! - [`RecordingHandler`]: an event handler that keeps every event it sees
//! - [`wait_for_state`]: polls a launcher until a record reaches a state

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::core::record::LaunchRecord;
use crate::core::types::{LaunchId, LaunchState};
use crate::events::{EventHandler, LaunchEvent};
use crate::launcher::TaskLauncher;

/// Event handler that records every event it receives.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tasklaunch::testing::RecordingHandler;
/// use tasklaunch::{EventBus, ImmediateLauncher, InMemoryStore, LaunchRequest, Registry, TaskLauncher};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let events = Arc::new(EventBus::new());
/// let recorder = Arc::new(RecordingHandler::new());
/// events.register(recorder.clone()).await;
///
/// let registry = Registry::new(Arc::new(InMemoryStore::new())).with_events(events);
/// let launcher = ImmediateLauncher::new(registry);
/// launcher.launch(LaunchRequest::new("hello")).await.unwrap();
///
/// assert_eq!(recorder.len().await, 1);
/// # }
/// ```
pub struct RecordingHandler {
    events: Mutex<Vec<LaunchEvent>>,
}

impl RecordingHandler {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// All events received so far, in order.
    pub async fn events(&self) -> Vec<LaunchEvent> {
        self.events.lock().await.clone()
    }

    /// Events concerning one launch id.
    pub async fn events_for(&self, id: &LaunchId) -> Vec<LaunchEvent> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|e| e.launch_id() == Some(id))
            .cloned()
            .collect()
    }

    /// Number of events received.
    pub async fn len(&self) -> usize {
        self.events.lock().await.len()
    }

    /// Whether no events were received.
    pub async fn is_empty(&self) -> bool {
        self.events.lock().await.is_empty()
    }

    /// Forget every recorded event.
    pub async fn clear(&self) {
        self.events.lock().await.clear();
    }
}

impl Default for RecordingHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle(&self, event: &LaunchEvent) {
        self.events.lock().await.push(event.clone());
    }
}

/// Poll `launcher` every 10ms until `id` reaches `expected`.
///
/// Returns the matching record, or `None` if `timeout` elapses first.
pub async fn wait_for_state(
    launcher: &dyn TaskLauncher,
    id: &LaunchId,
    expected: LaunchState,
    timeout: Duration,
) -> Option<LaunchRecord> {
    let start = tokio::time::Instant::now();
    loop {
        let record = launcher.status(id).await;
        if record.state == expected {
            return Some(record);
        }
        if start.elapsed() > timeout {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
