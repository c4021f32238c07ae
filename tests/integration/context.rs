//! Context integration tests.
//!
//! Starts a tracker from YAML, drives real shell commands through the
//! command runner and shuts the context down.

use std::sync::Arc;
use std::time::Duration;
use tasklaunch::testing::{RecordingHandler, wait_for_state};
use tasklaunch::{
    CommandRunner, LaunchError, LaunchEvent, LaunchMode, LaunchRequest, LaunchState,
    TrackerContext, YamlLoader,
};

const DEFERRED_SHARDED: &str = r#"
mode: deferred
ids:
  strategy: sequential
  prefix: "job-"
store:
  type: sharded
  shards: 4
log_events: false
"#;

#[tokio::test]
async fn test_runner_end_to_end() {
    let config = YamlLoader::parse_tracker_config(DEFERRED_SHARDED).unwrap();
    let ctx = TrackerContext::init(config).await.unwrap();
    assert_eq!(ctx.mode(), LaunchMode::Deferred);

    let recorder = Arc::new(RecordingHandler::new());
    ctx.events().register(recorder.clone()).await;

    let runner = CommandRunner::new(ctx.deferred().unwrap());
    let ok = runner.run(LaunchRequest::new("true")).await.unwrap();
    let bad = runner
        .run(LaunchRequest::new("echo nope >&2; exit 7"))
        .await
        .unwrap();
    assert_eq!(ok.id().as_str(), "job-1");
    assert_eq!(bad.id().as_str(), "job-2");

    let ok_record = ok.wait().await.unwrap();
    let bad_record = bad.wait().await.unwrap();
    assert_eq!(ok_record.state, LaunchState::Complete);
    assert_eq!(bad_record.state, LaunchState::Failed);
    assert_eq!(bad_record.error_detail.as_deref(), Some("exit code 7: nope"));

    let events = recorder.events().await;
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, LaunchEvent::Launched { .. }))
            .count(),
        2
    );
    assert!(
        events
            .iter()
            .any(|e| matches!(e, LaunchEvent::Completed { id, .. } if id.as_str() == "job-1"))
    );

    let report = ctx.shutdown().await.unwrap();
    assert_eq!(report.total, 2);
    assert_eq!(report.complete, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.cancelled_at_shutdown, 0);
}

#[tokio::test]
async fn test_shutdown_cancels_running_commands() {
    let config = YamlLoader::parse_tracker_config(DEFERRED_SHARDED).unwrap();
    let ctx = TrackerContext::init(config).await.unwrap();
    let launcher = ctx.launcher();

    let runner = CommandRunner::new(ctx.deferred().unwrap());
    let slow = runner.run(LaunchRequest::new("sleep 5")).await.unwrap();
    let id = slow.id().clone();
    wait_for_state(
        launcher.as_ref(),
        &id,
        LaunchState::Launched,
        Duration::from_secs(1),
    )
    .await
    .expect("command was never launched");

    let report = ctx.shutdown().await.unwrap();
    assert_eq!(report.cancelled_at_shutdown, 1);
    assert_eq!(report.cancelled, 1);

    // The command's own outcome arrives too late to move the record.
    let record = slow.cancel().await;
    assert_eq!(record.state, LaunchState::Cancelled);

    let result = launcher.launch(LaunchRequest::new("true")).await;
    assert!(matches!(result, Err(LaunchError::Closed)));
}

#[tokio::test]
async fn test_immediate_context_from_empty_config() {
    let mut config = YamlLoader::parse_tracker_config("").unwrap();
    config.log_events = false;
    let ctx = TrackerContext::init(config).await.unwrap();
    assert_eq!(ctx.mode(), LaunchMode::Immediate);

    let launcher = ctx.launcher();
    let id = launcher.launch(LaunchRequest::new("hello")).await.unwrap();
    assert_eq!(id.as_str(), "t-1");
    assert_eq!(launcher.status(&id).await.state, LaunchState::Complete);

    let snapshot = ctx.snapshot().await.unwrap();
    assert_eq!(snapshot.len(), 1);

    let report = ctx.shutdown().await.unwrap();
    assert_eq!(report.count(LaunchState::Complete), 1);
}
