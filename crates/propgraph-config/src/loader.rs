//! Tiered configuration loading

use crate::components::{
    CheckpointBackend, CheckpointConfig, GraphBackend, GraphConfig, IngestConfig, LoggingConfig,
    RecordLimit, ResetMode, RetryConfig, SourceConfig,
};
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Environment variable that disables reading the user config file
pub const TEST_MODE_ENV: &str = "PROPGRAPH_TEST_MODE";

/// Complete configuration for a propgraph invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PropgraphConfig {
    /// Run behavior: namespace, paging, limits, resume and reset
    pub ingest: IngestConfig,
    /// Write retry bounds
    pub retry: RetryConfig,
    /// Checkpoint persistence
    pub checkpoint: CheckpointConfig,
    /// Source catalog connection
    pub source: SourceConfig,
    /// Graph backend selection and connection
    pub graph: GraphConfig,
    /// Log output
    pub logging: LoggingConfig,
}

/// Values supplied on the command line; `None` leaves lower tiers untouched
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Catalog namespace
    pub namespace: Option<String>,
    /// Ids per page
    pub page_size: Option<usize>,
    /// Total-record limit
    pub limit: Option<RecordLimit>,
    /// Resume flag
    pub resume: Option<bool>,
    /// Reset mode
    pub reset: Option<ResetMode>,
    /// Explicit start cursor
    pub start_cursor: Option<String>,
    /// Maximum write attempts
    pub max_attempts: Option<u32>,
    /// Base backoff delay in milliseconds
    pub base_delay_ms: Option<u64>,
    /// Maximum backoff delay in milliseconds
    pub max_delay_ms: Option<u64>,
    /// Graph backend
    pub graph_backend: Option<GraphBackend>,
    /// Checkpoint file path
    pub checkpoint_path: Option<PathBuf>,
}

impl PropgraphConfig {
    /// Load configuration with precedence: defaults < file < env < overrides
    pub fn load(config_file: Option<PathBuf>, overrides: ConfigOverrides) -> ConfigResult<Self> {
        let mut config = Self::from_file_or_default(config_file)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_overrides(overrides);
        Ok(config)
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read and parse a configuration file
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(message) => ConfigError::Parse(format!(
                "{}: {}",
                path.display(),
                message
            )),
            other => other,
        })
    }

    fn from_file_or_default(config_file: Option<PathBuf>) -> ConfigResult<Self> {
        if std::env::var(TEST_MODE_ENV).is_ok() && config_file.is_none() {
            return Ok(Self::default());
        }

        let explicit = config_file.is_some();
        let path = config_file.or_else(|| Self::default_config_path().ok());

        match path {
            Some(path) if path.exists() => {
                debug!("Loading config file {}", path.display());
                Self::from_file(&path)
            }
            Some(path) if explicit => Err(ConfigError::File {
                path: path.display().to_string(),
                message: "file does not exist".to_string(),
            }),
            _ => Ok(Self::default()),
        }
    }

    /// Apply environment variables through `lookup`
    ///
    /// Takes a lookup function so callers and tests can supply values without
    /// touching the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(namespace) = lookup("PROPGRAPH_NAMESPACE") {
            self.ingest.namespace = namespace;
        }
        if let Some(size) = lookup("PROPGRAPH_PAGE_SIZE") {
            self.ingest.page_size = parse_env("PROPGRAPH_PAGE_SIZE", &size)?;
        }
        if let Some(limit) = lookup("PROPGRAPH_LIMIT") {
            self.ingest.limit = limit.parse()?;
        }
        if let Some(resume) = lookup("PROPGRAPH_RESUME") {
            self.ingest.resume = parse_bool("PROPGRAPH_RESUME", &resume)?;
        }
        if let Some(reset) = lookup("PROPGRAPH_RESET") {
            self.ingest.reset = reset.parse()?;
        }
        if let Some(cursor) = lookup("PROPGRAPH_START_CURSOR") {
            self.ingest.start_cursor = Some(cursor).filter(|c| !c.is_empty());
        }
        if let Some(timeout) = lookup("PROPGRAPH_OPERATION_TIMEOUT_SECS") {
            self.ingest.operation_timeout_secs =
                parse_env("PROPGRAPH_OPERATION_TIMEOUT_SECS", &timeout)?;
        }

        if let Some(attempts) = lookup("PROPGRAPH_MAX_ATTEMPTS") {
            self.retry.max_attempts = parse_env("PROPGRAPH_MAX_ATTEMPTS", &attempts)?;
        }
        if let Some(delay) = lookup("PROPGRAPH_BASE_DELAY_MS") {
            self.retry.base_delay_ms = parse_env("PROPGRAPH_BASE_DELAY_MS", &delay)?;
        }
        if let Some(delay) = lookup("PROPGRAPH_MAX_DELAY_MS") {
            self.retry.max_delay_ms = parse_env("PROPGRAPH_MAX_DELAY_MS", &delay)?;
        }

        if let Some(backend) = lookup("PROPGRAPH_CHECKPOINT_BACKEND") {
            self.checkpoint.backend = match backend.to_ascii_lowercase().as_str() {
                "file" => CheckpointBackend::File,
                "surrealdb" => CheckpointBackend::Surrealdb,
                other => {
                    return Err(ConfigError::invalid("checkpoint.backend", other.to_string()))
                }
            };
        }
        if let Some(path) = lookup("PROPGRAPH_CHECKPOINT_PATH") {
            self.checkpoint.path = PathBuf::from(path);
        }

        if let Some(host) = lookup("PINECONE_INDEX_HOST") {
            self.source.host = host;
        }
        if let Some(key) = lookup("PINECONE_API_KEY") {
            self.source.api_key = Some(key);
        }

        if let Some(backend) = lookup("PROPGRAPH_GRAPH_BACKEND") {
            self.graph.backend = parse_graph_backend(&backend)?;
        }
        if let Some(path) = lookup("PROPGRAPH_SURREALDB_PATH") {
            self.graph.surrealdb.path = path;
        }
        if let Some(uri) = lookup("NEO4J_URI") {
            self.graph.neo4j.uri = uri;
        }
        if let Some(user) = lookup("NEO4J_USER") {
            self.graph.neo4j.user = user;
        }
        if let Some(password) = lookup("NEO4J_PASSWORD") {
            self.graph.neo4j.password = Some(password);
        }

        if let Some(level) = lookup("PROPGRAPH_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Apply command-line overrides (highest priority)
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(namespace) = overrides.namespace {
            self.ingest.namespace = namespace;
        }
        if let Some(size) = overrides.page_size {
            self.ingest.page_size = size;
        }
        if let Some(limit) = overrides.limit {
            self.ingest.limit = limit;
        }
        if let Some(resume) = overrides.resume {
            self.ingest.resume = resume;
        }
        if let Some(reset) = overrides.reset {
            self.ingest.reset = reset;
        }
        if let Some(cursor) = overrides.start_cursor {
            self.ingest.start_cursor = Some(cursor);
        }
        if let Some(attempts) = overrides.max_attempts {
            self.retry.max_attempts = attempts;
        }
        if let Some(delay) = overrides.base_delay_ms {
            self.retry.base_delay_ms = delay;
        }
        if let Some(delay) = overrides.max_delay_ms {
            self.retry.max_delay_ms = delay;
        }
        if let Some(backend) = overrides.graph_backend {
            self.graph.backend = backend;
        }
        if let Some(path) = overrides.checkpoint_path {
            self.checkpoint.path = path;
        }
    }

    /// Validate every component needed for an ingest run
    pub fn validate(&self) -> ConfigResult<()> {
        self.ingest.validate()?;
        self.retry.validate()?;
        self.source.validate()?;
        self.graph.validate()?;
        Ok(())
    }

    /// Get default config file path
    pub fn default_config_path() -> ConfigResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::MissingValue("user config directory".to_string()))?
            .join("propgraph");
        Ok(config_dir.join("config.toml"))
    }

    /// Write an example config file, creating parent directories
    pub fn create_example(path: &Path) -> ConfigResult<()> {
        let file_error = |e: std::io::Error| ConfigError::File {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(file_error)?;
            }
        }
        std::fs::write(path, EXAMPLE_CONFIG).map_err(file_error)
    }

    /// Display the current configuration as TOML
    pub fn display_as_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, value.to_string()))
}

fn parse_bool(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, value.to_string())),
    }
}

fn parse_graph_backend(value: &str) -> ConfigResult<GraphBackend> {
    match value.trim().to_ascii_lowercase().as_str() {
        "surrealdb" | "surreal" => Ok(GraphBackend::Surrealdb),
        "neo4j" => Ok(GraphBackend::Neo4j),
        other => Err(ConfigError::invalid("graph.backend", other.to_string())),
    }
}

const EXAMPLE_CONFIG: &str = r#"# propgraph configuration
# Location: ~/.config/propgraph/config.toml

[ingest]
# Catalog namespace to ingest; checkpoints are kept per namespace
namespace = "properties"

# Ids requested per page (1-1000)
page_size = 100

# Total records to write: a number or "unbounded"
limit = "unbounded"

# Continue from the stored checkpoint
resume = true

# Destructive reset before paging: "none", "scoped" or "all"
reset = "none"

# Explicit cursor to start from (overrides the checkpoint)
# start_cursor = "..."

# Timeout for each catalog call and graph write
operation_timeout_secs = 30

[retry]
max_attempts = 5
base_delay_ms = 1000
max_delay_ms = 10000

[checkpoint]
# "file" or "surrealdb"
backend = "file"
path = "./propgraph-checkpoint.json"

[source]
# Index host (can also be set via PINECONE_INDEX_HOST)
host = "https://properties-abc123.svc.pinecone.io"

# API key (can also be set via PINECONE_API_KEY)
# api_key = "..."

api_version = "2024-07"
fetch_batch_size = 100
timeout_secs = 30

[graph]
# "surrealdb" or "neo4j"
backend = "surrealdb"

[graph.surrealdb]
# Directory for the database, or ":memory:"
path = "./propgraph.db"
namespace = "propgraph"
database = "graph"

[graph.neo4j]
uri = "bolt://localhost:7687"
user = "neo4j"
# password = "..."  (or NEO4J_PASSWORD)

[logging]
level = "info"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = PropgraphConfig::from_toml_str(
            r#"
            [ingest]
            namespace = "from-file"
            page_size = 50
            "#,
        )
        .unwrap();

        config
            .apply_env(env(&[
                ("PROPGRAPH_NAMESPACE", "from-env"),
                ("PROPGRAPH_LIMIT", "1200"),
                ("PROPGRAPH_RESET", "scoped"),
                ("NEO4J_PASSWORD", "secret"),
            ]))
            .unwrap();

        assert_eq!(config.ingest.namespace, "from-env");
        assert_eq!(config.ingest.page_size, 50);
        assert_eq!(config.ingest.limit, RecordLimit::Max(1200));
        assert_eq!(config.ingest.reset, ResetMode::Scoped);
        assert_eq!(config.graph.neo4j.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_overrides_beat_env() {
        let mut config = PropgraphConfig::default();
        config
            .apply_env(env(&[("PROPGRAPH_PAGE_SIZE", "10")]))
            .unwrap();
        config.apply_overrides(ConfigOverrides {
            page_size: Some(25),
            resume: Some(false),
            ..Default::default()
        });

        assert_eq!(config.ingest.page_size, 25);
        assert!(!config.ingest.resume);
    }

    #[test]
    fn test_invalid_env_value_is_reported() {
        let mut config = PropgraphConfig::default();
        let err = config
            .apply_env(env(&[("PROPGRAPH_MAX_ATTEMPTS", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("PROPGRAPH_MAX_ATTEMPTS"));
    }

    #[test]
    fn test_example_config_parses_and_round_trips() {
        let config = PropgraphConfig::from_toml_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(config.ingest.page_size, 100);
        assert_eq!(config.ingest.limit, RecordLimit::Unbounded);
        assert_eq!(config.graph.backend, GraphBackend::Surrealdb);
        config.validate().unwrap();

        let rendered = config.display_as_toml().unwrap();
        let reparsed = PropgraphConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(reparsed.ingest.namespace, config.ingest.namespace);
    }

    #[test]
    fn test_validate_requires_source_host() {
        let config = PropgraphConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingValue(field)) if field == "source.host"
        ));
    }
}
