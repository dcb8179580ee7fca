//! Source catalog configuration
//!
//! Connection settings for the vector-indexed catalog that holds the
//! property records (Pinecone-compatible data plane API).

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// Source catalog component configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Index host, e.g. `https://properties-abc123.svc.pinecone.io`
    pub host: String,
    /// API key (can also be set via `PINECONE_API_KEY`)
    pub api_key: Option<String>,
    /// Value sent in the `X-Pinecone-API-Version` header
    pub api_version: String,
    /// Maximum ids per metadata fetch request
    pub fetch_batch_size: usize,
    /// HTTP client timeout
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            api_key: None,
            api_version: "2024-07".to_string(),
            fetch_batch_size: 100,
            timeout_secs: 30,
        }
    }
}

impl SourceConfig {
    /// Validate connection settings
    pub fn validate(&self) -> ConfigResult<()> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingValue("source.host".to_string()));
        }
        if self.fetch_batch_size == 0 {
            return Err(ConfigError::invalid(
                "source.fetch_batch_size",
                "0 (must be at least 1)",
            ));
        }
        Ok(())
    }
}
