//! Shell command runner built on the deferred launcher.
//!
//! [`CommandRunner`] is a small execution collaborator: it records a launch,
//! runs the payload with `sh -c`, and reports the outcome back to the
//! tracker. It exists so hosts have something real to drive the deferred
//! lifecycle with; the tracker itself never executes anything.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::core::record::LaunchRecord;
use crate::core::request::LaunchRequest;
use crate::core::types::LaunchId;
use crate::launcher::{DeferredLauncher, LaunchError, TaskLauncher};
use crate::storage::LaunchStore;

/// Longest stderr excerpt kept in a failure detail.
const MAX_DETAIL_STDERR: usize = 512;

/// Errors returned by the command runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The payload is not a UTF-8 shell command.
    #[error("payload is not valid UTF-8")]
    NonUtf8Payload,

    /// The tracker rejected the launch or failed to record an outcome.
    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// The task driving the command panicked or was aborted.
    #[error("runner task failed: {0}")]
    Join(String),
}

/// How a command ended.
enum Outcome {
    Succeeded,
    Failed(String),
    TimedOut,
}

/// Runs shell command payloads and reports their outcome to a
/// [`DeferredLauncher`].
pub struct CommandRunner<S: LaunchStore + ?Sized + 'static> {
    launcher: Arc<DeferredLauncher<S>>,
    shell: String,
    timeout: Option<Duration>,
}

impl<S: LaunchStore + ?Sized + 'static> CommandRunner<S> {
    /// Create a runner that uses `sh` and no timeout.
    pub fn new(launcher: Arc<DeferredLauncher<S>>) -> Self {
        Self {
            launcher,
            shell: "sh".to_string(),
            timeout: None,
        }
    }

    /// Cancel launches that run longer than `duration`.
    pub fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Use a different shell (invoked as `<shell> -c <payload>`).
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Launch `request` and start running its payload in the background.
    pub async fn run(&self, request: LaunchRequest) -> Result<RunningLaunch<S>, RunnerError> {
        let command = request
            .payload
            .as_str()
            .ok_or(RunnerError::NonUtf8Payload)?
            .to_string();
        let record = self.launcher.launch_record(request).await?;
        let id = record.id;
        let revision = record.revision;

        // Outcomes are reported against this revision only; if the id is
        // launched again meanwhile, the newer record is left alone.
        let launcher = Arc::clone(&self.launcher);
        let shell = self.shell.clone();
        let limit = self.timeout;
        let task_id = id.clone();
        let handle = tokio::spawn(async move {
            match execute(&shell, &command, limit).await {
                Outcome::Succeeded => {
                    launcher.complete_revision(&task_id, revision).await?;
                }
                Outcome::Failed(detail) => {
                    launcher.fail_revision(&task_id, revision, detail).await?;
                }
                Outcome::TimedOut => {
                    launcher.cancel_revision(&task_id, revision).await;
                }
            }
            Ok::<_, LaunchError>(launcher.status(&task_id).await)
        });

        Ok(RunningLaunch {
            id,
            revision,
            handle,
            launcher: Arc::clone(&self.launcher),
        })
    }
}

/// A command started by [`CommandRunner::run`].
pub struct RunningLaunch<S: LaunchStore + ?Sized + 'static> {
    id: LaunchId,
    revision: u64,
    handle: JoinHandle<Result<LaunchRecord, LaunchError>>,
    launcher: Arc<DeferredLauncher<S>>,
}

impl<S: LaunchStore + ?Sized + 'static> RunningLaunch<S> {
    /// Launch id of the command.
    pub fn id(&self) -> &LaunchId {
        &self.id
    }

    /// Revision of the record this command reports to.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Wait for the command to finish and return the record for its id.
    ///
    /// If the id was launched again meanwhile, the record returned is the
    /// newer one.
    pub async fn wait(mut self) -> Result<LaunchRecord, RunnerError> {
        self.join().await
    }

    /// Wait for the command without giving up the handle, so the wait can
    /// be abandoned (for example in `select!`) and the launch cancelled
    /// afterwards. Must not be called again once it has returned.
    pub async fn join(&mut self) -> Result<LaunchRecord, RunnerError> {
        let record = (&mut self.handle)
            .await
            .map_err(|e| RunnerError::Join(e.to_string()))??;
        Ok(record)
    }

    /// Kill the command and cancel its launch.
    pub async fn cancel(self) -> LaunchRecord {
        // Dropping the driving future drops the child, which kills it.
        self.handle.abort();
        self.launcher.cancel_revision(&self.id, self.revision).await;
        self.launcher.status(&self.id).await
    }
}

async fn execute(shell: &str, command: &str, limit: Option<Duration>) -> Outcome {
    let mut cmd = Command::new(shell);
    cmd.arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return Outcome::Failed(format!("failed to spawn {}: {}", shell, e)),
    };

    let output = match limit {
        Some(duration) => match timeout(duration, child.wait_with_output()).await {
            Ok(output) => output,
            Err(_) => return Outcome::TimedOut,
        },
        None => child.wait_with_output().await,
    };

    let output = match output {
        Ok(output) => output,
        Err(e) => return Outcome::Failed(format!("failed to wait for command: {}", e)),
    };

    if output.status.success() {
        return Outcome::Succeeded;
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = truncate(stderr.trim(), MAX_DETAIL_STDERR);
    let status = match output.status.code() {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    };
    if stderr.is_empty() {
        Outcome::Failed(status)
    } else {
        Outcome::Failed(format!("{}: {}", status, stderr))
    }
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
