//! Lock-striped in-memory storage.
//!
//! Records are spread over a fixed number of shards, each behind its own
//! RwLock, so launches on different ids rarely contend.

use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::sync::RwLock;

use super::{LaunchStore, StorageError, sort_records};
use crate::core::record::{LaunchRecord, Transition};
use crate::core::types::{LaunchId, LaunchState};

/// Default number of shards.
pub const DEFAULT_SHARDS: usize = 16;

type Shard = RwLock<HashMap<LaunchId, LaunchRecord>>;

/// Sharded in-memory storage backend.
///
/// All operations on a single id touch exactly one shard. Listing visits
/// shards one at a time, so a listing is consistent per record but not a
/// point-in-time snapshot across shards.
pub struct ShardedStore {
    shards: Vec<Shard>,
    hasher: RandomState,
}

impl ShardedStore {
    /// Create a store with [`DEFAULT_SHARDS`] shards.
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// Create a store with the given number of shards (at least one).
    pub fn with_shards(count: usize) -> Self {
        let shards = (0..count.max(1))
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        Self {
            shards,
            hasher: RandomState::new(),
        }
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard(&self, id: &LaunchId) -> &Shard {
        let index = self.hasher.hash_one(id) as usize % self.shards.len();
        &self.shards[index]
    }
}

impl Default for ShardedStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LaunchStore for ShardedStore {
    async fn save(&self, mut record: LaunchRecord) -> Result<Option<LaunchRecord>, StorageError> {
        let mut shard = self
            .shard(&record.id)
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        record.supersede(shard.get(&record.id));
        Ok(shard.insert(record.id.clone(), record))
    }

    async fn create(&self, record: LaunchRecord) -> Result<(), StorageError> {
        let mut shard = self
            .shard(&record.id)
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        if shard.contains_key(&record.id) {
            return Err(StorageError::DuplicateKey(format!("launch: {}", record.id)));
        }
        shard.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &LaunchId) -> Result<Option<LaunchRecord>, StorageError> {
        let shard = self
            .shard(id)
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(shard.get(id).cloned())
    }

    async fn transition_at(
        &self,
        id: &LaunchId,
        transition: Transition,
        revision: Option<u64>,
    ) -> Result<Option<LaunchRecord>, StorageError> {
        let mut shard = self
            .shard(id)
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        let Some(record) = shard.get_mut(id) else {
            return Ok(None);
        };
        Ok(record
            .apply_at(&transition, revision)
            .then(|| record.clone()))
    }

    async fn list(&self, state: Option<LaunchState>) -> Result<Vec<LaunchRecord>, StorageError> {
        let mut result = Vec::new();
        for shard in &self.shards {
            let shard = shard.read().map_err(|_| StorageError::LockPoisoned)?;
            result.extend(
                shard
                    .values()
                    .filter(|r| state.is_none_or(|s| r.state == s))
                    .cloned(),
            );
        }
        sort_records(&mut result);
        Ok(result)
    }

    async fn len(&self) -> Result<usize, StorageError> {
        let mut total = 0;
        for shard in &self.shards {
            total += shard.read().map_err(|_| StorageError::LockPoisoned)?.len();
        }
        Ok(total)
    }
}
