//! In-memory storage implementation.
//!
//! Provides a thread-safe in-memory backend guarded by one lock.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{LaunchStore, StorageError, sort_records};
use crate::core::record::{LaunchRecord, Transition};
use crate::core::types::{LaunchId, LaunchState};

/// In-memory storage backend.
///
/// Thread-safe storage using a single RwLock over the whole map.
/// Data is not persisted across restarts.
pub struct InMemoryStore {
    records: RwLock<HashMap<LaunchId, LaunchRecord>>,
}

impl InMemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LaunchStore for InMemoryStore {
    async fn save(&self, mut record: LaunchRecord) -> Result<Option<LaunchRecord>, StorageError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        record.supersede(records.get(&record.id));
        Ok(records.insert(record.id.clone(), record))
    }

    async fn create(&self, record: LaunchRecord) -> Result<(), StorageError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        if records.contains_key(&record.id) {
            return Err(StorageError::DuplicateKey(format!("launch: {}", record.id)));
        }
        records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &LaunchId) -> Result<Option<LaunchRecord>, StorageError> {
        let records = self
            .records
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(records.get(id).cloned())
    }

    async fn transition_at(
        &self,
        id: &LaunchId,
        transition: Transition,
        revision: Option<u64>,
    ) -> Result<Option<LaunchRecord>, StorageError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        let Some(record) = records.get_mut(id) else {
            return Ok(None);
        };
        Ok(record
            .apply_at(&transition, revision)
            .then(|| record.clone()))
    }

    async fn list(&self, state: Option<LaunchState>) -> Result<Vec<LaunchRecord>, StorageError> {
        let records = self
            .records
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        let mut result: Vec<_> = records
            .values()
            .filter(|r| state.is_none_or(|s| r.state == s))
            .cloned()
            .collect();
        sort_records(&mut result);
        Ok(result)
    }

    async fn len(&self) -> Result<usize, StorageError> {
        let records = self
            .records
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(records.len())
    }
}
