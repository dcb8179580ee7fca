//! # propgraph Core
//!
//! Domain model and abstractions for ingesting catalogued property records
//! into a property graph.
//!
//! Core defines the traits; infrastructure crates implement them:
//!
//! - [`SourceCatalog`]: paginated, read-only record catalog (`propgraph-catalog`)
//! - [`GraphConnector`] / [`GraphSession`]: graph backends (`propgraph-surrealdb`,
//!   `propgraph-neo4j`)
//! - [`CheckpointStore`]: durable progress records (file and in-memory here,
//!   SurrealDB in `propgraph-surrealdb`)
//!
//! Raw catalog metadata becomes a [`PropertyRecord`] through [`normalize`].

pub mod catalog;
pub mod checkpoint;
pub mod error;
pub mod graph;
pub mod property;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use catalog::{IdPage, RawMetadata, SourceCatalog};
pub use checkpoint::{Checkpoint, CheckpointStore, FileCheckpointStore, InMemoryCheckpointStore};
pub use error::{
    CheckpointError, CheckpointResult, GraphError, GraphResult, SourceError, SourceResult,
};
pub use graph::{GraphConnector, GraphCounts, GraphSession};
pub use property::{normalize, NormalizeIssue, Normalized, PropertyRecord, SkipReason};

// Run-level settings shared with every backend
pub use propgraph_config::{RecordLimit, ResetMode};
