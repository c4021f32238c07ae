//! Shared bookkeeping behind every launcher.
//!
//! The registry owns the store, mints ids, validates requests, applies the
//! duplicate-id policy and emits lifecycle events. Launchers only decide
//! which state a new record starts in.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::LaunchError;
use super::ids::{IdGenerator, IdStrategy};
use crate::core::record::{LaunchRecord, Transition};
use crate::core::request::LaunchRequest;
use crate::core::types::LaunchId;
use crate::events::{EventBus, LaunchEvent};
use crate::storage::{LaunchStore, StorageError};

/// How many times a minted id is retried when it is already taken.
const MAX_MINT_ATTEMPTS: usize = 16;

/// What happens when a request carries an id that already has a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Replace the existing record (last write wins).
    #[default]
    Overwrite,
    /// Fail the launch with `InvalidRequest`.
    Reject,
}

/// Shared launch bookkeeping.
pub struct Registry<S: LaunchStore + ?Sized> {
    store: Arc<S>,
    events: Arc<EventBus>,
    ids: IdGenerator,
    duplicates: DuplicatePolicy,
    max_payload_bytes: Option<usize>,
    closed: AtomicBool,
    // Launches hold the read side while they record; `close` takes the write
    // side, so no launch lands after `close` returns.
    gate: RwLock<()>,
}

impl<S: LaunchStore + ?Sized> Registry<S> {
    /// Create a registry over the given store with default settings.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            events: Arc::new(EventBus::new()),
            ids: IdGenerator::default(),
            duplicates: DuplicatePolicy::default(),
            max_payload_bytes: None,
            closed: AtomicBool::new(false),
            gate: RwLock::new(()),
        }
    }

    /// Set the event bus events are emitted to.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// Set the id minting strategy.
    pub fn with_id_strategy(mut self, strategy: IdStrategy) -> Self {
        self.ids = IdGenerator::new(strategy);
        self
    }

    /// Set the duplicate-id policy.
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    /// Reject payloads larger than `limit` bytes.
    pub fn with_max_payload_bytes(mut self, limit: usize) -> Self {
        self.max_payload_bytes = Some(limit);
        self
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The event bus.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// The duplicate-id policy in use.
    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicates
    }

    /// Stop accepting launches. Transitions on existing records still work.
    ///
    /// Waits for launches that already passed the closed check, so once this
    /// returns the store holds every record it will ever get.
    pub async fn close(&self) {
        let _gate = self.gate.write().await;
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Whether the registry stopped accepting launches.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn validate(&self, request: &LaunchRequest) -> Result<(), LaunchError> {
        if request.payload.is_empty() {
            return Err(LaunchError::InvalidRequest("payload is empty".into()));
        }
        let size = request.payload.len();
        if let Some(limit) = self.max_payload_bytes.filter(|&limit| size > limit) {
            return Err(LaunchError::InvalidRequest(format!(
                "payload is {} bytes, limit is {}",
                size, limit
            )));
        }
        if request.id.as_ref().is_some_and(LaunchId::is_blank) {
            return Err(LaunchError::InvalidRequest("launch id is blank".into()));
        }
        Ok(())
    }

    /// Record a launch, building the initial record with `initial`.
    pub async fn record(
        &self,
        request: LaunchRequest,
        initial: fn(LaunchId) -> LaunchRecord,
    ) -> Result<LaunchId, LaunchError> {
        Ok(self.record_launch(request, initial).await?.id)
    }

    /// Like [`record`](Self::record), but returns the stored record so the
    /// caller knows which revision it launched.
    pub async fn record_launch(
        &self,
        request: LaunchRequest,
        initial: fn(LaunchId) -> LaunchRecord,
    ) -> Result<LaunchRecord, LaunchError> {
        let _gate = self.gate.read().await;
        if self.is_closed() {
            return Err(LaunchError::Closed);
        }
        self.validate(&request)?;

        let (record, previous) = match request.id {
            Some(id) => self.record_explicit(initial(id)).await?,
            None => (self.record_minted(initial).await?, None),
        };

        if let Some(previous) = previous {
            self.events
                .emit(LaunchEvent::replaced(record.id.clone(), previous.state))
                .await;
        }
        self.events
            .emit(LaunchEvent::launched(
                record.id.clone(),
                record.state,
                record.revision,
            ))
            .await;
        Ok(record)
    }

    async fn record_explicit(
        &self,
        mut record: LaunchRecord,
    ) -> Result<(LaunchRecord, Option<LaunchRecord>), LaunchError> {
        match self.duplicates {
            DuplicatePolicy::Overwrite => {
                let previous = self.store.save(record.clone()).await?;
                record.supersede(previous.as_ref());
                Ok((record, previous))
            }
            DuplicatePolicy::Reject => match self.store.create(record.clone()).await {
                Ok(()) => Ok((record, None)),
                Err(StorageError::DuplicateKey(_)) => Err(LaunchError::InvalidRequest(format!(
                    "duplicate launch id: {}",
                    record.id
                ))),
                Err(e) => Err(e.into()),
            },
        }
    }

    async fn record_minted(
        &self,
        initial: fn(LaunchId) -> LaunchRecord,
    ) -> Result<LaunchRecord, LaunchError> {
        for _ in 0..MAX_MINT_ATTEMPTS {
            let record = initial(self.ids.next_id());
            match self.store.create(record.clone()).await {
                Ok(()) => return Ok(record),
                // Taken by an explicit id; mint the next one.
                Err(StorageError::DuplicateKey(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(LaunchError::Storage(StorageError::Other(format!(
            "no free launch id after {} attempts",
            MAX_MINT_ATTEMPTS
        ))))
    }

    /// Look up a record; unknown ids and store failures yield `Unknown`.
    pub async fn status(&self, id: &LaunchId) -> LaunchRecord {
        match self.store.get(id).await {
            Ok(Some(record)) => record,
            Ok(None) => LaunchRecord::unknown(id.clone()),
            Err(e) => {
                self.events
                    .emit(LaunchEvent::store_failed("status", e))
                    .await;
                LaunchRecord::unknown(id.clone())
            }
        }
    }

    /// Apply a transition to the current revision of `id` and emit the
    /// matching event if it applied.
    pub async fn transition(
        &self,
        id: &LaunchId,
        transition: Transition,
    ) -> Result<Option<LaunchRecord>, LaunchError> {
        self.transition_at(id, transition, None).await
    }

    /// Apply a transition only if `id` is still at `revision` (any revision
    /// when `None`).
    pub async fn transition_at(
        &self,
        id: &LaunchId,
        transition: Transition,
        revision: Option<u64>,
    ) -> Result<Option<LaunchRecord>, LaunchError> {
        let event = match &transition {
            Transition::Complete => LaunchEvent::completed(id.clone()),
            Transition::Fail(detail) => LaunchEvent::failed(id.clone(), detail.clone()),
            Transition::Cancel => LaunchEvent::cancelled(id.clone()),
        };
        let updated = self.store.transition_at(id, transition, revision).await?;
        if updated.is_some() {
            self.events.emit(event).await;
        }
        Ok(updated)
    }

    /// Cancel a launched record. Unknown ids, terminal records and store
    /// failures are all no-ops for the caller.
    pub async fn cancel(&self, id: &LaunchId) {
        self.cancel_at(id, None).await;
    }

    /// Cancel `id` only while it is still at `revision`.
    pub async fn cancel_at(&self, id: &LaunchId, revision: Option<u64>) {
        if let Err(e) = self.transition_at(id, Transition::Cancel, revision).await {
            self.events
                .emit(LaunchEvent::store_failed("cancel", e))
                .await;
        }
    }
}
