//! Launch tracking.
//!
//! [`TaskLauncher`] is the narrow capability callers depend on: launch,
//! cancel and status. Two implementations sit behind it:
//!
//! - [`ImmediateLauncher`] marks every launch `Complete` as soon as it is
//!   recorded. It suits synchronous hosts and test doubles.
//! - [`DeferredLauncher`] records launches as `Launched` and waits for the
//!   execution collaborator to signal completion or failure.
//!
//! Both share a [`Registry`] for id minting, validation and events.

mod deferred;
mod ids;
mod immediate;
mod registry;

pub use deferred::DeferredLauncher;
pub use ids::{DEFAULT_ID_PREFIX, IdGenerator, IdStrategy};
pub use immediate::ImmediateLauncher;
pub use registry::{DuplicatePolicy, Registry};

use async_trait::async_trait;
use thiserror::Error;

use crate::core::record::LaunchRecord;
use crate::core::request::LaunchRequest;
use crate::core::types::LaunchId;
use crate::storage::StorageError;

/// Errors returned by launch operations.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The launch request is malformed.
    #[error("invalid launch request: {0}")]
    InvalidRequest(String),

    /// The tracker has been shut down.
    #[error("tracker is closed")]
    Closed,

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Capability to launch work and track its lifecycle.
#[async_trait]
pub trait TaskLauncher: Send + Sync {
    /// Record a launch and return its id.
    async fn launch(&self, request: LaunchRequest) -> Result<LaunchId, LaunchError>;

    /// Cancel a launch. Unknown ids and finished launches are left alone.
    async fn cancel(&self, id: &LaunchId);

    /// Current record for `id`; `Unknown` if the tracker has none.
    async fn status(&self, id: &LaunchId) -> LaunchRecord;
}
