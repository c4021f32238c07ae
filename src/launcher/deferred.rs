//! Launcher that waits for the execution collaborator to report back.

use async_trait::async_trait;
use std::sync::Arc;

use super::registry::Registry;
use super::{LaunchError, TaskLauncher};
use crate::core::record::{LaunchRecord, Transition};
use crate::core::request::LaunchRequest;
use crate::core::types::LaunchId;
use crate::storage::LaunchStore;

/// Asynchronous-completion launcher.
///
/// Accepted launches are stored as `Launched`. Whoever executes the work
/// calls [`complete`](Self::complete) or [`fail`](Self::fail) when it
/// finishes; [`cancel`](TaskLauncher::cancel) stops tracking it as running.
/// Only `Launched` records move, so the first signal wins.
///
/// An id launched again under the overwrite policy starts a new revision.
/// Collaborators that may outlive a re-launch should record the revision
/// with [`launch_record`](Self::launch_record) and signal through the
/// `*_revision` methods, so a late outcome of the earlier run is ignored.
pub struct DeferredLauncher<S: LaunchStore + ?Sized> {
    registry: Registry<S>,
}

impl<S: LaunchStore + ?Sized> DeferredLauncher<S> {
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

    /// Launch and return the stored record, including its revision.
    pub async fn launch_record(
        &self,
        request: LaunchRequest,
    ) -> Result<LaunchRecord, LaunchError> {
        self.registry
            .record_launch(request, LaunchRecord::launched)
            .await
    }

    /// Mark a launched record complete. Returns whether it changed.
    pub async fn complete(&self, id: &LaunchId) -> Result<bool, LaunchError> {
        self.signal(id, Transition::Complete, None).await
    }

    /// Mark `id` complete only if it is still at `revision`.
    pub async fn complete_revision(
        &self,
        id: &LaunchId,
        revision: u64,
    ) -> Result<bool, LaunchError> {
        self.signal(id, Transition::Complete, Some(revision)).await
    }

    /// Mark a launched record failed with `detail`. Returns whether it changed.
    pub async fn fail(
        &self,
        id: &LaunchId,
        detail: impl Into<String> + Send,
    ) -> Result<bool, LaunchError> {
        self.signal(id, Transition::Fail(detail.into()), None).await
    }

    /// Mark `id` failed only if it is still at `revision`.
    pub async fn fail_revision(
        &self,
        id: &LaunchId,
        revision: u64,
        detail: impl Into<String> + Send,
    ) -> Result<bool, LaunchError> {
        self.signal(id, Transition::Fail(detail.into()), Some(revision))
            .await
    }

    /// Cancel `id` only if it is still at `revision`. Never fails.
    pub async fn cancel_revision(&self, id: &LaunchId, revision: u64) {
        self.registry.cancel_at(id, Some(revision)).await;
    }

    async fn signal(
        &self,
        id: &LaunchId,
        transition: Transition,
        revision: Option<u64>,
    ) -> Result<bool, LaunchError> {
        let updated = self
            .registry
            .transition_at(id, transition, revision)
            .await?;
        Ok(updated.is_some())
    }
}

#[async_trait]
impl<S: LaunchStore + ?Sized> TaskLauncher for DeferredLauncher<S> {
    async fn launch(&self, request: LaunchRequest) -> Result<LaunchId, LaunchError> {
        self.registry.record(request, LaunchRecord::launched).await
    }

    async fn cancel(&self, id: &LaunchId) {
        self.registry.cancel(id).await;
    }

    async fn status(&self, id: &LaunchId) -> LaunchRecord {
        self.registry.status(id).await
    }
}
