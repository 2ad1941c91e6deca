//! Graph synchronization settings
//!
//! Settings are read from JSON; every field has a default so partial
//! documents are accepted.

use crate::events::DEFAULT_EVENT_SUBJECT;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Error type for config loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings for recorders and mergers of one object graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphSyncConfig {
    /// Initial state of the recording flag
    pub recording_enabled: bool,
    /// Emit one event per recorded operation
    pub events_enabled: bool,
    /// Subject events are published under
    pub event_subject: String,
    /// Only clear a to-one arc on deletion when it points at the deleted target
    pub verify_arc_deletion: bool,
}

impl Default for GraphSyncConfig {
    fn default() -> Self {
        Self {
            recording_enabled: true,
            events_enabled: false,
            event_subject: DEFAULT_EVENT_SUBJECT.to_string(),
            verify_arc_deletion: false,
        }
    }
}

impl GraphSyncConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_subject.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "eventSubject cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
