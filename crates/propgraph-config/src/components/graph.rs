//! Graph store configuration
//!
//! Selects the backend the pipeline writes to and carries its connection
//! settings.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// Graph backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphBackend {
    /// Embedded SurrealDB (in-memory or RocksDB)
    #[default]
    Surrealdb,
    /// Neo4j over Bolt
    Neo4j,
}

/// Graph component configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub backend: GraphBackend,
    pub surrealdb: SurrealGraphConfig,
    pub neo4j: Neo4jGraphConfig,
}

/// Embedded SurrealDB settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurrealGraphConfig {
    /// Database directory, or `:memory:` for an in-memory database
    pub path: String,
    pub namespace: String,
    pub database: String,
}

impl Default for SurrealGraphConfig {
    fn default() -> Self {
        Self {
            path: "./propgraph.db".to_string(),
            namespace: "propgraph".to_string(),
            database: "graph".to_string(),
        }
    }
}

/// Neo4j connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Neo4jGraphConfig {
    pub uri: String,
    pub user: String,
    /// Password (can also be set via `NEO4J_PASSWORD`)
    pub password: Option<String>,
    /// Target database; the server default is used when unset
    pub database: Option<String>,
}

impl Default for Neo4jGraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: None,
            database: None,
        }
    }
}

impl GraphConfig {
    /// Validate settings for the selected backend
    pub fn validate(&self) -> ConfigResult<()> {
        match self.backend {
            GraphBackend::Surrealdb => {
                if self.surrealdb.path.trim().is_empty() {
                    return Err(ConfigError::MissingValue("graph.surrealdb.path".to_string()));
                }
            }
            GraphBackend::Neo4j => {
                if self.neo4j.uri.trim().is_empty() {
                    return Err(ConfigError::MissingValue("graph.neo4j.uri".to_string()));
                }
                if self.neo4j.password.is_none() {
                    return Err(ConfigError::MissingValue(
                        "graph.neo4j.password".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}
