//! Concurrency integration tests.
//!
//! Many tasks launch, poll and signal at once; ids must stay unique and
//! readers must only ever see whole records.

use std::collections::HashSet;
use std::sync::Arc;
use tasklaunch::{
    DeferredLauncher, ImmediateLauncher, InMemoryStore, LaunchId, LaunchRequest, LaunchState,
    LaunchStore, ShardedStore, TaskLauncher,
};

const LAUNCHES: usize = 1000;

async fn launch_concurrently(launcher: Arc<dyn TaskLauncher>) -> Vec<LaunchId> {
    let mut handles = Vec::with_capacity(LAUNCHES);
    for i in 0..LAUNCHES {
        let launcher = Arc::clone(&launcher);
        handles.push(tokio::spawn(async move {
            launcher
                .launch(LaunchRequest::new(format!("job {}", i)))
                .await
                .unwrap()
        }));
    }

    let mut ids = Vec::with_capacity(LAUNCHES);
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_minted_ids_are_unique_in_memory_store() {
    let store = Arc::new(InMemoryStore::new());
    let launcher = Arc::new(ImmediateLauncher::with_store(Arc::clone(&store)));

    let ids = launch_concurrently(launcher.clone()).await;

    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), LAUNCHES);
    assert_eq!(store.len().await.unwrap(), LAUNCHES);
    for id in &ids {
        let record = launcher.status(id).await;
        assert_eq!(record.state, LaunchState::Complete);
        assert_eq!(record.revision, 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_minted_ids_are_unique_in_sharded_store() {
    let store = Arc::new(ShardedStore::with_shards(8));
    let launcher = Arc::new(DeferredLauncher::with_store(Arc::clone(&store)));

    let ids = launch_concurrently(launcher.clone()).await;

    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), LAUNCHES);
    assert_eq!(store.len().await.unwrap(), LAUNCHES);
    assert_eq!(
        store.list(Some(LaunchState::Launched)).await.unwrap().len(),
        LAUNCHES
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_see_partial_records() {
    let launcher = Arc::new(DeferredLauncher::with_store(Arc::new(ShardedStore::new())));

    let mut ids = Vec::new();
    for _ in 0..200 {
        ids.push(launcher.launch(LaunchRequest::new("work")).await.unwrap());
    }

    let writer = {
        let launcher = Arc::clone(&launcher);
        let ids = ids.clone();
        tokio::spawn(async move {
            for (i, id) in ids.iter().enumerate() {
                if i % 2 == 0 {
                    launcher.complete(id).await.unwrap();
                } else {
                    launcher.fail(id, format!("exit code {}", i)).await.unwrap();
                }
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..4 {
        let launcher = Arc::clone(&launcher);
        let ids = ids.clone();
        readers.push(tokio::spawn(async move {
            for _ in 0..5 {
                for id in &ids {
                    let record = launcher.status(id).await;
                    match record.state {
                        LaunchState::Failed => assert!(record.error_detail.is_some()),
                        LaunchState::Launched | LaunchState::Complete => {
                            assert!(record.error_detail.is_none());
                            assert!(record.launched_at.is_some());
                        }
                        other => panic!("unexpected state {} for {}", other, id),
                    }
                    if record.state.is_terminal() {
                        assert!(record.ended_at.is_some());
                    }
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_signals_apply_once() {
    let launcher = Arc::new(DeferredLauncher::with_store(Arc::new(InMemoryStore::new())));
    let id = launcher.launch(LaunchRequest::new("work")).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let launcher = Arc::clone(&launcher);
        let id = id.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                launcher.complete(&id).await.unwrap()
            } else {
                launcher.fail(&id, "lost the race").await.unwrap()
            }
        }));
    }

    let mut applied = 0;
    for handle in handles {
        if handle.await.unwrap() {
            applied += 1;
        }
    }
    assert_eq!(applied, 1);

    let record = launcher.status(&id).await;
    match record.state {
        LaunchState::Complete => assert!(record.error_detail.is_none()),
        LaunchState::Failed => assert_eq!(record.error_detail.as_deref(), Some("lost the race")),
        other => panic!("unexpected state {}", other),
    }
    assert_eq!(record.revision, 1);
}
