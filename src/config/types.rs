//! Configuration type definitions.

use serde::{Deserialize, Serialize};

use crate::launcher::{DuplicatePolicy, IdStrategy};
use crate::storage::DEFAULT_SHARDS;

/// Tracker configuration (tasklaunch.yaml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Which launcher the context builds.
    pub mode: LaunchMode,
    /// Id minting for requests without an explicit id.
    pub ids: IdStrategy,
    /// What to do when an explicit id is launched again.
    pub duplicate_ids: DuplicatePolicy,
    /// Storage backend.
    pub store: StoreConfig,
    /// Largest accepted payload, in bytes.
    pub max_payload_bytes: Option<usize>,
    /// Register a tracing handler on the event bus.
    pub log_events: bool,
    /// Cancel records still `Launched` when the context shuts down.
    pub cancel_in_flight_on_shutdown: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            mode: LaunchMode::default(),
            ids: IdStrategy::default(),
            duplicate_ids: DuplicatePolicy::default(),
            store: StoreConfig::default(),
            max_payload_bytes: None,
            log_events: true,
            cancel_in_flight_on_shutdown: true,
        }
    }
}

/// Launcher selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMode {
    /// Launches are recorded as complete right away.
    #[default]
    Immediate,
    /// Launches stay `Launched` until completion is signaled.
    Deferred,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StoreConfig {
    /// Single-lock in-memory store.
    #[serde(rename = "memory")]
    #[default]
    Memory,
    /// Lock-striped in-memory store.
    #[serde(rename = "sharded")]
    Sharded {
        /// Number of shards.
        #[serde(default = "default_shards")]
        shards: usize,
    },
}

fn default_shards() -> usize {
    DEFAULT_SHARDS
}
