//! Launcher that marks work done as soon as it is recorded.

use async_trait::async_trait;
use std::sync::Arc;

use super::registry::Registry;
use super::{LaunchError, TaskLauncher};
use crate::core::record::LaunchRecord;
use crate::core::request::LaunchRequest;
use crate::core::types::LaunchId;
use crate::storage::LaunchStore;

/// Synchronous fire-and-mark-done launcher.
///
/// Nothing is executed; every accepted launch is stored as `Complete`.
/// Because records are terminal from the start, `cancel` never changes
/// anything.
pub struct ImmediateLauncher<S: LaunchStore + ?Sized> {
    registry: Registry<S>,
}

impl<S: LaunchStore + ?Sized> ImmediateLauncher<S> {
    /// Create a launcher from a configured registry.
    pub fn new(registry: Registry<S>) -> Self {
        Self { registry }
    }

    /// Create a launcher over `store` with default settings.
    pub fn with_store(store: Arc<S>) -> Self {
        Self::new(Registry::new(store))
    }

    /// The shared registry.
    pub fn registry(&self) -> &Registry<S> {
        &self.registry
    }
}

#[async_trait]
impl<S: LaunchStore + ?Sized> TaskLauncher for ImmediateLauncher<S> {
    async fn launch(&self, request: LaunchRequest) -> Result<LaunchId, LaunchError> {
        self.registry.record(request, LaunchRecord::completed).await
    }

    async fn cancel(&self, id: &LaunchId) {
        self.registry.cancel(id).await;
    }

    async fn status(&self, id: &LaunchId) -> LaunchRecord {
        self.registry.status(id).await
    }
}
