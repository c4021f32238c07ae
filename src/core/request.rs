//! Launch requests submitted by an external collaborator.

use std::fmt;

use super::types::LaunchId;

/// Opaque command payload carried by a launch request.
///
/// The tracker never interprets the bytes; it only checks that a payload
/// is present and within the configured size limit.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Payload(Vec<u8>);

impl Payload {
    /// Create a payload from raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Payload as UTF-8 text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload has no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(text) => write!(f, "Payload({:?})", text),
            None => write!(f, "Payload({} bytes)", self.0.len()),
        }
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// A request to launch a unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    /// Explicit identifier. When absent the tracker mints one.
    pub id: Option<LaunchId>,
    /// Opaque command payload.
    pub payload: Payload,
}

impl LaunchRequest {
    /// Create a request with a tracker-minted id.
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            id: None,
            payload: payload.into(),
        }
    }

    /// Create a request with an explicit id.
    pub fn with_id(id: impl Into<LaunchId>, payload: impl Into<Payload>) -> Self {
        Self {
            id: Some(id.into()),
            payload: payload.into(),
        }
    }
}
