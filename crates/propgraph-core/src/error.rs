//! Error Types
//!
//! Failure taxonomy shared by the source catalog, graph backends and
//! checkpoint stores. Graph errors carry the retriable/fatal classification
//! the write path depends on.

use thiserror::Error;

/// Errors raised by a source catalog
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    /// The pagination cursor was rejected (expired or unknown)
    #[error("Invalid pagination cursor: {0}")]
    InvalidCursor(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout error: operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The catalog answered with a non-success status
    #[error("Catalog API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response body did not have the expected shape
    #[error("Failed to parse catalog response: {0}")]
    Parse(String),
}

/// Result type for source catalog operations
pub type SourceResult<T> = Result<T, SourceError>;

impl SourceError {
    /// Whether the failure is a rejected cursor, the trigger for skip-by-count
    pub fn is_invalid_cursor(&self) -> bool {
        matches!(self, Self::InvalidCursor(_))
    }
}

/// Errors raised by a graph backend
#[derive(Error, Debug, Clone)]
pub enum GraphError {
    #[error("Connection error: {0}")]
    Connection(String),

    /// The session or its underlying connection is no longer usable
    #[error("Session expired: {0}")]
    SessionExpired(String),

    /// Deadlocks, lock timeouts and other conflicts that clear on their own
    #[error("Transient error: {0}")]
    Transient(String),

    #[error("Timeout error: operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// The statement was rejected as malformed
    #[error("Query error: {0}")]
    Query(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

impl GraphError {
    /// Check if the operation may succeed on a fresh session
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_)
                | Self::SessionExpired(_)
                | Self::Transient(_)
                | Self::Timeout { .. }
        )
    }
}

/// Errors raised by a checkpoint store
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storage backend error (database, remote store)
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for checkpoint operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;
