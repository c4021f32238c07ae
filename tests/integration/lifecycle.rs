//! Launch lifecycle integration tests.
//!
//! Drives both launchers through the public API: launching with minted and
//! caller-chosen ids, status lookups, cancellation and store failures.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tasklaunch::testing::{RecordingHandler, wait_for_state};
use tasklaunch::{
    DeferredLauncher, DuplicatePolicy, EventBus, IdStrategy, ImmediateLauncher, InMemoryStore,
    LaunchError, LaunchEvent, LaunchId, LaunchRecord, LaunchRequest, LaunchState, LaunchStore,
    Registry, ShardedStore, StorageError, TaskLauncher, Transition,
};

/// Store whose every operation fails.
struct BrokenStore;

#[async_trait]
impl LaunchStore for BrokenStore {
    async fn save(&self, _record: LaunchRecord) -> Result<Option<LaunchRecord>, StorageError> {
        Err(StorageError::LockPoisoned)
    }

    async fn create(&self, _record: LaunchRecord) -> Result<(), StorageError> {
        Err(StorageError::LockPoisoned)
    }

    async fn get(&self, _id: &LaunchId) -> Result<Option<LaunchRecord>, StorageError> {
        Err(StorageError::LockPoisoned)
    }

    async fn transition_at(
        &self,
        _id: &LaunchId,
        _transition: Transition,
        _revision: Option<u64>,
    ) -> Result<Option<LaunchRecord>, StorageError> {
        Err(StorageError::LockPoisoned)
    }

    async fn list(&self, _state: Option<LaunchState>) -> Result<Vec<LaunchRecord>, StorageError> {
        Err(StorageError::LockPoisoned)
    }

    async fn len(&self) -> Result<usize, StorageError> {
        Err(StorageError::LockPoisoned)
    }
}

#[tokio::test]
async fn test_first_minted_launch_is_complete() {
    let launcher = ImmediateLauncher::with_store(Arc::new(InMemoryStore::new()));

    let id = launcher.launch(LaunchRequest::new("hello")).await.unwrap();
    assert_eq!(id, LaunchId::new("t-1"));

    let record = launcher.status(&id).await;
    assert_eq!(record.state, LaunchState::Complete);
    assert!(record.error_detail.is_none());
}

#[tokio::test]
async fn test_custom_id_last_write_wins() {
    let launcher = ImmediateLauncher::with_store(Arc::new(InMemoryStore::new()));

    let first = launcher
        .launch(LaunchRequest::with_id("custom", "x"))
        .await
        .unwrap();
    let second = launcher
        .launch(LaunchRequest::with_id("custom", "y"))
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(first.as_str(), "custom");

    let record = launcher.status(&first).await;
    assert_eq!(record.state, LaunchState::Complete);
    assert_eq!(record.revision, 2);
}

#[tokio::test]
async fn test_never_launched_is_unknown() {
    let launcher = ImmediateLauncher::with_store(Arc::new(InMemoryStore::new()));

    let record = launcher.status(&LaunchId::new("never-launched")).await;
    assert_eq!(record.state, LaunchState::Unknown);
    assert_eq!(record.id.as_str(), "never-launched");
    assert!(!record.is_known());
}

#[tokio::test]
async fn test_cancel_unknown_does_not_create_record() {
    let store = Arc::new(InMemoryStore::new());
    let launcher = DeferredLauncher::with_store(Arc::clone(&store));

    launcher.cancel(&LaunchId::new("ghost")).await;

    assert_eq!(
        launcher.status(&LaunchId::new("ghost")).await.state,
        LaunchState::Unknown
    );
    assert!(store.is_empty().await.unwrap());
}

#[tokio::test]
async fn test_explicit_id_does_not_consume_minted_sequence() {
    let launcher = ImmediateLauncher::with_store(Arc::new(InMemoryStore::new()));

    launcher
        .launch(LaunchRequest::with_id("mine", "x"))
        .await
        .unwrap();
    let minted = launcher.launch(LaunchRequest::new("y")).await.unwrap();
    assert_eq!(minted.as_str(), "t-1");
}

#[tokio::test]
async fn test_minting_skips_ids_taken_explicitly() {
    let launcher = ImmediateLauncher::with_store(Arc::new(InMemoryStore::new()));

    launcher
        .launch(LaunchRequest::with_id("t-1", "squatter"))
        .await
        .unwrap();
    let minted = launcher.launch(LaunchRequest::new("y")).await.unwrap();
    assert_eq!(minted.as_str(), "t-2");

    let squatter = launcher.status(&LaunchId::new("t-1")).await;
    assert_eq!(squatter.revision, 1);
}

#[tokio::test]
async fn test_reject_policy_refuses_duplicates() {
    let registry = Registry::new(Arc::new(InMemoryStore::new()))
        .with_duplicate_policy(DuplicatePolicy::Reject);
    let launcher = ImmediateLauncher::new(registry);

    launcher
        .launch(LaunchRequest::with_id("custom", "x"))
        .await
        .unwrap();
    let result = launcher.launch(LaunchRequest::with_id("custom", "y")).await;

    match result {
        Err(LaunchError::InvalidRequest(msg)) => assert!(msg.contains("custom")),
        other => panic!("expected InvalidRequest, got {:?}", other),
    }
    assert_eq!(
        launcher.status(&LaunchId::new("custom")).await.revision,
        1
    );
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let registry =
        Registry::new(Arc::new(InMemoryStore::new())).with_max_payload_bytes(4);
    let launcher = ImmediateLauncher::new(registry);

    assert!(matches!(
        launcher.launch(LaunchRequest::new("")).await,
        Err(LaunchError::InvalidRequest(_))
    ));
    assert!(matches!(
        launcher.launch(LaunchRequest::new("too long")).await,
        Err(LaunchError::InvalidRequest(_))
    ));
    assert!(matches!(
        launcher.launch(LaunchRequest::with_id("  ", "ok")).await,
        Err(LaunchError::InvalidRequest(_))
    ));
    assert!(launcher.registry().store().is_empty().await.unwrap());
}

#[tokio::test]
async fn test_deferred_lifecycle_through_trait_object() {
    let deferred = Arc::new(DeferredLauncher::with_store(Arc::new(ShardedStore::new())));
    let launcher: Arc<dyn TaskLauncher> = deferred.clone();

    let ok = launcher.launch(LaunchRequest::new("a")).await.unwrap();
    let bad = launcher.launch(LaunchRequest::new("b")).await.unwrap();
    let stopped = launcher.launch(LaunchRequest::new("c")).await.unwrap();

    for id in [&ok, &bad, &stopped] {
        assert_eq!(launcher.status(id).await.state, LaunchState::Launched);
    }

    let worker = Arc::clone(&deferred);
    let (ok_id, bad_id) = (ok.clone(), bad.clone());
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        worker.complete(&ok_id).await.unwrap();
        worker.fail(&bad_id, "exit code 2").await.unwrap();
    });
    launcher.cancel(&stopped).await;

    wait_for_state(
        launcher.as_ref(),
        &ok,
        LaunchState::Complete,
        Duration::from_secs(2),
    )
    .await
    .expect("launch never completed");
    let failed = wait_for_state(
        launcher.as_ref(),
        &bad,
        LaunchState::Failed,
        Duration::from_secs(2),
    )
    .await
    .expect("launch never failed");
    assert_eq!(failed.error_detail.as_deref(), Some("exit code 2"));
    assert_eq!(launcher.status(&stopped).await.state, LaunchState::Cancelled);

    // Terminal records ignore later signals.
    assert!(!deferred.complete(&stopped).await.unwrap());
    launcher.cancel(&ok).await;
    assert_eq!(launcher.status(&ok).await.state, LaunchState::Complete);
}

#[tokio::test]
async fn test_uuid_ids() {
    let registry = Registry::new(Arc::new(InMemoryStore::new()))
        .with_id_strategy(IdStrategy::Uuid);
    let launcher = ImmediateLauncher::new(registry);

    let a = launcher.launch(LaunchRequest::new("a")).await.unwrap();
    let b = launcher.launch(LaunchRequest::new("b")).await.unwrap();
    assert_ne!(a, b);
    assert_eq!(a.as_str().len(), 36);
}

#[tokio::test]
async fn test_store_failures_degrade_status_and_cancel() {
    let events = Arc::new(EventBus::new());
    let recorder = Arc::new(RecordingHandler::new());
    events.register(recorder.clone()).await;
    let store: Arc<dyn LaunchStore> = Arc::new(BrokenStore);
    let launcher = DeferredLauncher::new(Registry::new(store).with_events(events));

    let launch = launcher.launch(LaunchRequest::new("x")).await;
    assert!(matches!(
        launch,
        Err(LaunchError::Storage(StorageError::LockPoisoned))
    ));

    let id = LaunchId::new("t-1");
    assert_eq!(launcher.status(&id).await.state, LaunchState::Unknown);
    launcher.cancel(&id).await;
    assert!(launcher.complete(&id).await.is_err());

    let operations: Vec<_> = recorder
        .events()
        .await
        .into_iter()
        .filter_map(|e| match e {
            LaunchEvent::StoreFailed { operation, .. } => Some(operation),
            _ => None,
        })
        .collect();
    assert_eq!(operations, vec!["status", "cancel"]);
}
