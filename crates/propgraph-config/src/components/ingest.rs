//! Ingest run configuration
//!
//! Namespace, paging, limits, resume and reset behavior for a single run.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Smallest page size accepted by the source catalog
pub const MIN_PAGE_SIZE: usize = 1;

/// Largest page size accepted by the source catalog
pub const MAX_PAGE_SIZE: usize = 1000;

/// Ingest component configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Catalog namespace to read; checkpoints are scoped to it
    pub namespace: String,
    /// Number of ids requested per page
    pub page_size: usize,
    /// Total number of records to write before stopping
    pub limit: RecordLimit,
    /// Resume from the stored checkpoint when one matches the namespace
    pub resume: bool,
    /// Destructive graph reset performed once before paging
    pub reset: ResetMode,
    /// Explicit cursor to start from; takes precedence over any checkpoint
    pub start_cursor: Option<String>,
    /// Upper bound for every catalog call and graph write
    pub operation_timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            namespace: "properties".to_string(),
            page_size: 100,
            limit: RecordLimit::Unbounded,
            resume: true,
            reset: ResetMode::None,
            start_cursor: None,
            operation_timeout_secs: 30,
        }
    }
}

impl IngestConfig {
    /// Validate ranges and required values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::MissingValue("ingest.namespace".to_string()));
        }
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(ConfigError::invalid(
                "ingest.page_size",
                format!(
                    "{} (must be between {} and {})",
                    self.page_size, MIN_PAGE_SIZE, MAX_PAGE_SIZE
                ),
            ));
        }
        if self.operation_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "ingest.operation_timeout_secs",
                "0 (must be at least 1 second)",
            ));
        }
        if let RecordLimit::Max(0) = self.limit {
            return Err(ConfigError::invalid(
                "ingest.limit",
                "0 (use \"unbounded\" or a positive count)",
            ));
        }
        Ok(())
    }
}

/// Total-record limit for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordLimit {
    /// Ingest until the source is exhausted
    #[default]
    Unbounded,
    /// Stop once this many records have been written
    Max(u64),
}

impl RecordLimit {
    /// Number of records still allowed after `processed` have been written
    pub fn remaining(&self, processed: u64) -> Option<u64> {
        match self {
            RecordLimit::Unbounded => None,
            RecordLimit::Max(max) => Some(max.saturating_sub(processed)),
        }
    }

    /// Whether `processed` has reached the limit
    pub fn is_reached(&self, processed: u64) -> bool {
        matches!(self.remaining(processed), Some(0))
    }
}

impl fmt::Display for RecordLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordLimit::Unbounded => f.write_str("unbounded"),
            RecordLimit::Max(max) => write!(f, "{}", max),
        }
    }
}

impl FromStr for RecordLimit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "unbounded" | "all" | "none" | "" => Ok(RecordLimit::Unbounded),
            other => other
                .parse::<u64>()
                .map(RecordLimit::Max)
                .map_err(|_| ConfigError::invalid("ingest.limit", trimmed.to_string())),
        }
    }
}

impl Serialize for RecordLimit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RecordLimit::Unbounded => serializer.serialize_str("unbounded"),
            RecordLimit::Max(max) => serializer.serialize_u64(*max),
        }
    }
}

impl<'de> Deserialize<'de> for RecordLimit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Count(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Count(count) => Ok(RecordLimit::Max(count)),
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Destructive reset applied once at the start of a run
///
/// Reset is opt-in only; [`ResetMode::None`] is the default and is never
/// replaced implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetMode {
    /// Leave the graph untouched
    #[default]
    None,
    /// Delete only Property, Zip and Neighborhood nodes and their relationships
    Scoped,
    /// Delete the entire graph
    All,
}

impl ResetMode {
    /// Whether this mode deletes any data
    pub fn is_destructive(&self) -> bool {
        !matches!(self, ResetMode::None)
    }
}

impl fmt::Display for ResetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetMode::None => f.write_str("none"),
            ResetMode::Scoped => f.write_str("scoped"),
            ResetMode::All => f.write_str("all"),
        }
    }
}

impl FromStr for ResetMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(ResetMode::None),
            "scoped" => Ok(ResetMode::Scoped),
            "all" => Ok(ResetMode::All),
            other => Err(ConfigError::invalid(
                "ingest.reset",
                format!("{} (expected none, scoped or all)", other),
            )),
        }
    }
}
