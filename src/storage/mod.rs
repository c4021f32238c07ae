//! Storage abstraction for launch records.
//!
//! This module provides a trait-based storage abstraction with two
//! in-memory backends: a single-lock map and a lock-striped map.

mod memory;
mod sharded;

pub use memory::InMemoryStore;
pub use sharded::{DEFAULT_SHARDS, ShardedStore};

use async_trait::async_trait;
use thiserror::Error;

use crate::core::record::{LaunchRecord, Transition};
use crate::core::types::{LaunchId, LaunchState};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested item was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A duplicate key was detected.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// Storage lock was poisoned.
    #[error("storage lock poisoned")]
    LockPoisoned,

    /// Generic storage error.
    #[error("storage error: {0}")]
    Other(String),
}

/// Storage trait for launch records.
///
/// Every method runs its mutation inside a single critical section, so
/// readers never see a half-applied record.
#[async_trait]
pub trait LaunchStore: Send + Sync {
    /// Insert or replace a record, returning the one it replaced.
    ///
    /// Implementations call [`LaunchRecord::supersede`] with the previous
    /// record so the revision keeps counting across re-launches.
    async fn save(&self, record: LaunchRecord) -> Result<Option<LaunchRecord>, StorageError>;

    /// Insert a record only if its id is not present yet.
    async fn create(&self, record: LaunchRecord) -> Result<(), StorageError>;

    /// Get a record by id.
    async fn get(&self, id: &LaunchId) -> Result<Option<LaunchRecord>, StorageError>;

    /// Apply a transition to an existing record, but only while it is at
    /// `revision` (any revision when `None`).
    ///
    /// Returns the updated record if the transition applied, `None` if the
    /// id is unknown, the record moved on to a newer revision, or it could
    /// not move.
    async fn transition_at(
        &self,
        id: &LaunchId,
        transition: Transition,
        revision: Option<u64>,
    ) -> Result<Option<LaunchRecord>, StorageError>;

    /// Apply a transition to the current revision of a record.
    async fn transition(
        &self,
        id: &LaunchId,
        transition: Transition,
    ) -> Result<Option<LaunchRecord>, StorageError> {
        self.transition_at(id, transition, None).await
    }

    /// List records, optionally filtered by state, oldest launch first.
    async fn list(&self, state: Option<LaunchState>) -> Result<Vec<LaunchRecord>, StorageError>;

    /// Number of records held.
    async fn len(&self) -> Result<usize, StorageError>;

    /// Whether the store holds no records.
    async fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len().await? == 0)
    }
}

/// Sort records by launch time, then id, for stable listings.
pub(crate) fn sort_records(records: &mut [LaunchRecord]) {
    records.sort_by(|a, b| {
        a.launched_at
            .cmp(&b.launched_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
