//! tasklaunch - a small, concurrent task launch status tracker.
//!
//! An external collaborator submits [`LaunchRequest`]s through a
//! [`TaskLauncher`]; the tracker records each launch under a [`LaunchId`]
//! and answers status queries with copies of its [`LaunchRecord`]s.
//!
//! ```
//! use std::sync::Arc;
//! use tasklaunch::{ImmediateLauncher, InMemoryStore, LaunchId, LaunchRequest, LaunchState, TaskLauncher};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let launcher = ImmediateLauncher::with_store(Arc::new(InMemoryStore::new()));
//!
//! let id = launcher.launch(LaunchRequest::new("hello")).await.unwrap();
//! assert_eq!(id.as_str(), "t-1");
//! assert_eq!(launcher.status(&id).await.state, LaunchState::Complete);
//!
//! let unknown = launcher.status(&LaunchId::new("never-launched")).await;
//! assert_eq!(unknown.state, LaunchState::Unknown);
//! # }
//! ```

pub mod config;
pub mod context;
pub mod core;
pub mod events;
pub mod launcher;
pub mod runner;
pub mod storage;
pub mod testing;

pub use config::{ConfigError, LaunchMode, StoreConfig, TrackerConfig, YamlLoader};
pub use context::{ContextError, ShutdownReport, TrackerContext};
pub use crate::core::record::{LaunchRecord, Transition};
pub use crate::core::request::{LaunchRequest, Payload};
pub use crate::core::types::{LaunchId, LaunchState};
pub use events::{EventBus, EventHandler, LaunchEvent, TracingHandler};
pub use launcher::{
    DeferredLauncher, DuplicatePolicy, IdGenerator, IdStrategy, ImmediateLauncher, LaunchError,
    Registry, TaskLauncher,
};
pub use runner::{CommandRunner, RunnerError, RunningLaunch};
pub use storage::{InMemoryStore, LaunchStore, ShardedStore, StorageError};
