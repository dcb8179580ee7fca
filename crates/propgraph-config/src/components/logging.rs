//! Logging configuration

use serde::{Deserialize, Serialize};

/// Logging component configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level for propgraph crates (`error`, `warn`, `info`, `debug`, `trace`)
    pub level: String,
    /// Include the event target (module path) in each line
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            include_target: false,
        }
    }
}
