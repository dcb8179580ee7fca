//! Checkpoint persistence configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where checkpoints are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointBackend {
    /// JSON file on local disk
    #[default]
    File,
    /// Key-value record in the SurrealDB graph database
    Surrealdb,
}

/// Checkpoint component configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    pub backend: CheckpointBackend,
    /// JSON file used by the `file` backend
    pub path: PathBuf,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            backend: CheckpointBackend::File,
            path: PathBuf::from("./propgraph-checkpoint.json"),
        }
    }
}
