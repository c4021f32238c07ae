//! Launch records and the transitions that mutate them.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use super::types::{LaunchId, LaunchState};

/// A state change requested by the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The launched work finished successfully.
    Complete,
    /// The launched work finished with an error.
    Fail(String),
    /// The launch was cancelled.
    Cancel,
}

impl Transition {
    /// State a record ends up in once this transition applies.
    pub fn target(&self) -> LaunchState {
        match self {
            Transition::Complete => LaunchState::Complete,
            Transition::Fail(_) => LaunchState::Failed,
            Transition::Cancel => LaunchState::Cancelled,
        }
    }
}

/// Lifecycle record of a single launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchRecord {
    /// Launch identifier.
    pub id: LaunchId,
    /// Current lifecycle state.
    pub state: LaunchState,
    /// Error detail, only present when `state` is `Failed`.
    pub error_detail: Option<String>,
    /// How many times this id has been launched.
    pub revision: u64,
    /// When the current revision was launched.
    pub launched_at: Option<SystemTime>,
    /// When the current revision reached a terminal state.
    pub ended_at: Option<SystemTime>,
}

impl LaunchRecord {
    /// Record for an id the tracker knows nothing about.
    pub fn unknown(id: LaunchId) -> Self {
        Self {
            id,
            state: LaunchState::Unknown,
            error_detail: None,
            revision: 0,
            launched_at: None,
            ended_at: None,
        }
    }

    /// Fresh record awaiting completion.
    pub fn launched(id: LaunchId) -> Self {
        Self {
            id,
            state: LaunchState::Launched,
            error_detail: None,
            revision: 1,
            launched_at: Some(SystemTime::now()),
            ended_at: None,
        }
    }

    /// Fresh record that is already complete.
    pub fn completed(id: LaunchId) -> Self {
        let now = SystemTime::now();
        Self {
            id,
            state: LaunchState::Complete,
            error_detail: None,
            revision: 1,
            launched_at: Some(now),
            ended_at: Some(now),
        }
    }

    /// Continue the revision count of the record this one replaces.
    pub fn supersede(&mut self, previous: Option<&LaunchRecord>) {
        self.revision = previous.map_or(1, |p| p.revision + 1);
    }

    /// Apply a transition. Only `Launched` records can move; returns
    /// whether the record changed.
    pub fn apply(&mut self, transition: &Transition) -> bool {
        if self.state != LaunchState::Launched {
            return false;
        }
        self.state = transition.target();
        self.ended_at = Some(SystemTime::now());
        self.error_detail = match transition {
            Transition::Fail(detail) => Some(detail.clone()),
            Transition::Complete | Transition::Cancel => None,
        };
        true
    }

    /// Apply a transition only while the record is at `revision`.
    ///
    /// `None` matches any revision. A signal meant for an earlier launch of
    /// the same id never moves the record that replaced it.
    pub fn apply_at(&mut self, transition: &Transition, revision: Option<u64>) -> bool {
        if revision.is_some_and(|r| r != self.revision) {
            return false;
        }
        self.apply(transition)
    }

    /// Whether the tracker holds a record for this id.
    pub fn is_known(&self) -> bool {
        self.state != LaunchState::Unknown
    }
}
