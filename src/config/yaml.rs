//! YAML configuration parsing.
//!
//! Parses and validates tracker configuration from YAML files.

use std::path::Path;

use super::error::ConfigError;
use super::types::{StoreConfig, TrackerConfig};
use crate::launcher::IdStrategy;

/// Loads configuration from YAML.
pub struct YamlLoader;

impl YamlLoader {
    /// Load tracker configuration from a file.
    pub fn load_tracker_config(path: impl AsRef<Path>) -> Result<TrackerConfig, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_tracker_config(&content)
    }

    /// Parse tracker configuration from a YAML string.
    ///
    /// An empty document yields the default configuration.
    pub fn parse_tracker_config(yaml: &str) -> Result<TrackerConfig, ConfigError> {
        let config = if yaml.trim().is_empty() {
            TrackerConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        Self::validate_tracker_config(&config)?;
        Ok(config)
    }

    /// Validate a tracker configuration.
    pub fn validate_tracker_config(config: &TrackerConfig) -> Result<(), ConfigError> {
        if let StoreConfig::Sharded { shards: 0 } = config.store {
            return Err(ConfigError::InvalidConfig(
                "store.shards must be at least 1".into(),
            ));
        }

        if config.max_payload_bytes == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "max_payload_bytes cannot be zero".into(),
            ));
        }

        if let IdStrategy::Sequential { prefix } = &config.ids {
            if prefix.trim().is_empty() {
                return Err(ConfigError::InvalidConfig(
                    "ids.prefix cannot be empty".into(),
                ));
            }
        }

        Ok(())
    }
}
