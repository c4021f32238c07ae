//! Launch id minting.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::types::LaunchId;

/// Default prefix for sequential ids.
pub const DEFAULT_ID_PREFIX: &str = "t-";

fn default_prefix() -> String {
    DEFAULT_ID_PREFIX.to_string()
}

/// How the tracker mints ids for requests that do not carry one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum IdStrategy {
    /// `<prefix><n>` with `n` counting up from 1.
    Sequential {
        #[serde(default = "default_prefix")]
        prefix: String,
    },
    /// Random v4 UUIDs.
    Uuid,
}

impl Default for IdStrategy {
    fn default() -> Self {
        IdStrategy::Sequential {
            prefix: default_prefix(),
        }
    }
}

/// Mints ids that are unique for the lifetime of the generator.
#[derive(Debug)]
pub struct IdGenerator {
    strategy: IdStrategy,
    counter: AtomicU64,
}

impl IdGenerator {
    /// Create a generator for the given strategy.
    pub fn new(strategy: IdStrategy) -> Self {
        Self {
            strategy,
            counter: AtomicU64::new(0),
        }
    }

    /// Mint the next id.
    pub fn next_id(&self) -> LaunchId {
        match &self.strategy {
            IdStrategy::Sequential { prefix } => {
                let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
                LaunchId::new(format!("{}{}", prefix, n))
            }
            IdStrategy::Uuid => LaunchId::random(),
        }
    }

    /// The strategy in use.
    pub fn strategy(&self) -> &IdStrategy {
        &self.strategy
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(IdStrategy::default())
    }
}
