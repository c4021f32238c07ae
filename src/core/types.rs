//! Core identifier and state types for the tracker.
//!
//! These types provide a type-safe launch identifier and the lifecycle
//! states a launch can be in.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a launch request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaunchId(String);

impl LaunchId {
    /// Create a new LaunchId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random LaunchId backed by a v4 UUID.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the underlying string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is empty or only whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for LaunchId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for LaunchId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for LaunchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchState {
    /// The tracker has no record of this id.
    Unknown,
    /// Launch was accepted and is awaiting completion.
    Launched,
    /// Launch finished successfully.
    Complete,
    /// Launch finished with an error.
    Failed,
    /// Launch was cancelled before it finished.
    Cancelled,
}

impl LaunchState {
    /// All states, in lifecycle order.
    pub const ALL: [LaunchState; 5] = [
        LaunchState::Unknown,
        LaunchState::Launched,
        LaunchState::Complete,
        LaunchState::Failed,
        LaunchState::Cancelled,
    ];

    /// Whether no further transition can happen from this state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LaunchState::Complete | LaunchState::Failed | LaunchState::Cancelled
        )
    }

    /// Lowercase name, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            LaunchState::Unknown => "unknown",
            LaunchState::Launched => "launched",
            LaunchState::Complete => "complete",
            LaunchState::Failed => "failed",
            LaunchState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for LaunchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
