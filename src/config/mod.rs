//! Configuration loading and parsing.
//!
//! This module provides YAML-based configuration for the tracker.

mod error;
mod types;
mod yaml;

pub use error::ConfigError;
pub use types::{LaunchMode, StoreConfig, TrackerConfig};
pub use yaml::YamlLoader;
