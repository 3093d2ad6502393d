//! Facade configuration
//!
//! Loaded from a JSON file or built in code. Missing keys take defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::Severity;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(String),

    #[error("Invalid config JSON: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Data-access facade configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacadeConfig {
    /// Namespace every record lives in (default: "test")
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Replication factor used for approximate counts. When unset it is
    /// read from the store's namespace info.
    #[serde(default)]
    pub replication_factor: Option<u32>,

    /// Deletions between two delete-all progress events (default: 10000)
    #[serde(default = "default_delete_progress_interval")]
    pub delete_progress_interval: u64,

    /// Minimum severity for the JSON logger (default: INFO)
    #[serde(default = "default_log_level")]
    pub log_level: Severity,
}

fn default_namespace() -> String {
    "test".to_string()
}

fn default_delete_progress_interval() -> u64 {
    10_000
}

fn default_log_level() -> Severity {
    Severity::Info
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            replication_factor: None,
            delete_progress_interval: default_delete_progress_interval(),
            log_level: default_log_level(),
        }
    }
}

impl FacadeConfig {
    /// Config for one namespace, defaults elsewhere
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Loads and validates a JSON config file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;

        let config: FacadeConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::Invalid("namespace must not be empty".into()));
        }

        if self.delete_progress_interval == 0 {
            return Err(ConfigError::Invalid(
                "delete_progress_interval must be > 0".into(),
            ));
        }

        if self.replication_factor == Some(0) {
            return Err(ConfigError::Invalid("replication_factor must be >= 1".into()));
        }

        Ok(())
    }
}
