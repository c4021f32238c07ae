//! Tracker context and lifecycle.
//!
//! A [`TrackerContext`] owns one store, one event bus and one launcher. The
//! host creates it with [`TrackerContext::init`] at startup, hands `Arc`
//! handles to whoever launches or polls, and calls
//! [`TrackerContext::shutdown`] on the way out.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{ConfigError, LaunchMode, StoreConfig, TrackerConfig, YamlLoader};
use crate::core::record::{LaunchRecord, Transition};
use crate::core::types::LaunchState;
use crate::events::{EventBus, TracingHandler};
use crate::launcher::{
    DeferredLauncher, ImmediateLauncher, LaunchError, Registry, TaskLauncher,
};
use crate::storage::{InMemoryStore, LaunchStore, ShardedStore, StorageError};

/// Errors raised while starting or stopping a context.
#[derive(Debug, Error)]
pub enum ContextError {
    /// Configuration was invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A launcher operation failed.
    #[error("launch error: {0}")]
    Launch(#[from] LaunchError),
}

enum ActiveLauncher {
    Immediate(Arc<ImmediateLauncher<dyn LaunchStore>>),
    Deferred(Arc<DeferredLauncher<dyn LaunchStore>>),
}

impl ActiveLauncher {
    fn registry(&self) -> &Registry<dyn LaunchStore> {
        match self {
            ActiveLauncher::Immediate(launcher) => launcher.registry(),
            ActiveLauncher::Deferred(launcher) => launcher.registry(),
        }
    }
}

/// Summary returned by [`TrackerContext::shutdown`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    /// Records held at shutdown.
    pub total: usize,
    /// Records still awaiting completion.
    pub launched: usize,
    /// Records that completed.
    pub complete: usize,
    /// Records that failed.
    pub failed: usize,
    /// Records that were cancelled, including those cancelled by shutdown.
    pub cancelled: usize,
    /// Records cancelled because they were still in flight.
    pub cancelled_at_shutdown: usize,
}

impl ShutdownReport {
    fn from_records(records: &[LaunchRecord], cancelled_at_shutdown: usize) -> Self {
        let count = |state: LaunchState| records.iter().filter(|r| r.state == state).count();
        Self {
            total: records.len(),
            launched: count(LaunchState::Launched),
            complete: count(LaunchState::Complete),
            failed: count(LaunchState::Failed),
            cancelled: count(LaunchState::Cancelled),
            cancelled_at_shutdown,
        }
    }

    /// Number of records in `state`.
    pub fn count(&self, state: LaunchState) -> usize {
        match state {
            LaunchState::Unknown => 0,
            LaunchState::Launched => self.launched,
            LaunchState::Complete => self.complete,
            LaunchState::Failed => self.failed,
            LaunchState::Cancelled => self.cancelled,
        }
    }
}

/// Process-wide tracker wiring, passed explicitly instead of living in a global.
pub struct TrackerContext {
    launcher: ActiveLauncher,
    store: Arc<dyn LaunchStore>,
    events: Arc<EventBus>,
    cancel_in_flight: bool,
}

impl TrackerContext {
    /// Validate `config` and build the store, event bus and launcher.
    pub async fn init(config: TrackerConfig) -> Result<Self, ContextError> {
        YamlLoader::validate_tracker_config(&config)?;

        let store: Arc<dyn LaunchStore> = match config.store {
            StoreConfig::Memory => Arc::new(InMemoryStore::new()),
            StoreConfig::Sharded { shards } => Arc::new(ShardedStore::with_shards(shards)),
        };

        let events = Arc::new(EventBus::new());
        if config.log_events {
            events.register(Arc::new(TracingHandler)).await;
        }

        let mut registry = Registry::new(Arc::clone(&store))
            .with_events(Arc::clone(&events))
            .with_id_strategy(config.ids)
            .with_duplicate_policy(config.duplicate_ids);
        if let Some(limit) = config.max_payload_bytes {
            registry = registry.with_max_payload_bytes(limit);
        }

        let launcher = match config.mode {
            LaunchMode::Immediate => {
                ActiveLauncher::Immediate(Arc::new(ImmediateLauncher::new(registry)))
            }
            LaunchMode::Deferred => {
                ActiveLauncher::Deferred(Arc::new(DeferredLauncher::new(registry)))
            }
        };

        Ok(Self {
            launcher,
            store,
            events,
            cancel_in_flight: config.cancel_in_flight_on_shutdown,
        })
    }

    /// Launcher handle for callers that launch, cancel or poll.
    pub fn launcher(&self) -> Arc<dyn TaskLauncher> {
        match &self.launcher {
            ActiveLauncher::Immediate(launcher) => launcher.clone(),
            ActiveLauncher::Deferred(launcher) => launcher.clone(),
        }
    }

    /// The deferred launcher, for execution collaborators that signal
    /// completion. `None` in immediate mode.
    pub fn deferred(&self) -> Option<Arc<DeferredLauncher<dyn LaunchStore>>> {
        match &self.launcher {
            ActiveLauncher::Immediate(_) => None,
            ActiveLauncher::Deferred(launcher) => Some(Arc::clone(launcher)),
        }
    }

    /// Which launcher this context runs.
    pub fn mode(&self) -> LaunchMode {
        match self.launcher {
            ActiveLauncher::Immediate(_) => LaunchMode::Immediate,
            ActiveLauncher::Deferred(_) => LaunchMode::Deferred,
        }
    }

    /// The event bus launch events are emitted to.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// The backing store.
    pub fn store(&self) -> Arc<dyn LaunchStore> {
        Arc::clone(&self.store)
    }

    /// All records, oldest launch first.
    pub async fn snapshot(&self) -> Result<Vec<LaunchRecord>, ContextError> {
        Ok(self.store.list(None).await?)
    }

    /// Stop accepting launches and summarize what the tracker holds.
    ///
    /// Launches already in progress finish recording before the in-flight
    /// sweep runs, so every record the sweep can miss is terminal.
    /// Launcher handles that outlive the context keep answering `status`
    /// and `cancel`, but `launch` fails with `Closed`.
    pub async fn shutdown(self) -> Result<ShutdownReport, ContextError> {
        let registry = self.launcher.registry();
        registry.close().await;

        let mut cancelled_at_shutdown = 0;
        if self.cancel_in_flight {
            for record in self.store.list(Some(LaunchState::Launched)).await? {
                let cancelled = registry
                    .transition(&record.id, Transition::Cancel)
                    .await?;
                if cancelled.is_some() {
                    cancelled_at_shutdown += 1;
                }
            }
        }

        let records = self.store.list(None).await?;
        Ok(ShutdownReport::from_records(&records, cancelled_at_shutdown))
    }
}
