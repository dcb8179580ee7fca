//! Pipeline error types

use propgraph_core::{GraphError, SourceError};
use thiserror::Error;

/// A graph operation that failed for good, after any retries
#[derive(Debug, Error)]
#[error("{operation} failed after {attempts} attempt(s): {source}")]
pub struct RetryFailure {
    /// What was being attempted, e.g. `merge property 42`
    pub operation: String,
    pub attempts: u32,
    /// `true` when every attempt failed retriably
    pub exhausted: bool,
    #[source]
    pub source: GraphError,
}

/// Errors that abort an ingest run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Schema bootstrap failed: {0}")]
    Bootstrap(#[source] RetryFailure),

    #[error("Graph reset failed: {0}")]
    Reset(#[source] RetryFailure),

    #[error("Reading page {page} from the catalog failed: {source}")]
    Source {
        page: u64,
        #[source]
        source: SourceError,
    },

    #[error("Writing property {zpid} on page {page} failed: {source}")]
    Write {
        page: u64,
        zpid: i64,
        #[source]
        source: RetryFailure,
    },
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
