//! SurrealDB backend for propgraph
//!
//! Stores the property graph in an embedded SurrealDB database: `property`,
//! `zip` and `neighborhood` tables joined by `in_zip` and `in_neighborhood`
//! relation tables. The same database can also hold ingest checkpoints.
//!
//! ## Supported Engines
//!
//! - **Memory**: `path = ":memory:"`, for tests and dry runs
//! - **RocksDB**: any other path, requires the `rocksdb` feature

mod checkpoint_store;
mod connector;
mod error;
mod queries;

pub use checkpoint_store::SurrealCheckpointStore;
pub use connector::{SurrealGraphConnector, SurrealGraphSession};
pub use error::classify_error;
