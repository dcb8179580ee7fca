//! Configuration error types

use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field holds a value outside its accepted domain
    #[error("Invalid value for {field}: {value}")]
    InvalidValue {
        /// Dotted path of the offending field (e.g. `ingest.page_size`)
        field: String,
        /// Description of the rejected value
        value: String,
    },

    /// A required field has no value from any tier
    #[error("Missing required value: {0}")]
    MissingValue(String),

    /// The configuration file could not be read or written
    #[error("Config file error at {path}: {message}")]
    File {
        /// Path of the file involved
        path: String,
        /// Underlying error message
        message: String,
    },

    /// The configuration file is not valid TOML for this schema
    #[error("Failed to parse config: {0}")]
    Parse(String),
}

/// Convenient Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    /// Create an invalid-value error
    pub fn invalid(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
        }
    }
}
