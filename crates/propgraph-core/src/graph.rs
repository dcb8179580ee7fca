//! Graph store abstraction
//!
//! A [`GraphConnector`] opens sessions; a [`GraphSession`] performs schema
//! bootstrap, resets and per-record merges. Every failure is a
//! [`GraphError`](crate::GraphError) so callers can tell retriable faults
//! from fatal ones.
//!
//! The graph shape is fixed:
//!
//! ```text
//! (Property {zpid})-[IN_ZIP]->(Zip {code})
//! (Property {zpid})-[IN_NEIGHBORHOOD]->(Neighborhood {name})
//! ```

use crate::error::GraphResult;
use crate::property::PropertyRecord;
use async_trait::async_trait;
use propgraph_config::ResetMode;
use serde::{Deserialize, Serialize};

/// Node and relationship counts for the ingested graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphCounts {
    pub properties: u64,
    pub zips: u64,
    pub neighborhoods: u64,
    pub in_zip: u64,
    pub in_neighborhood: u64,
}

/// Opens sessions against a graph backend
#[async_trait]
pub trait GraphConnector: Send + Sync {
    /// Open a fresh session
    async fn connect(&self) -> GraphResult<Box<dyn GraphSession>>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

/// A live session on a graph backend
#[async_trait]
pub trait GraphSession: Send + Sync {
    /// Create the `Property.zpid` uniqueness constraint and the `Zip.code`
    /// and `Neighborhood.name` indexes if they do not exist
    async fn ensure_schema(&self) -> GraphResult<()>;

    /// Delete graph data according to `mode`; [`ResetMode::None`] is a no-op
    async fn reset(&self, mode: ResetMode) -> GraphResult<()>;

    /// Merge one record in a single transaction
    ///
    /// Overwrites the property's scalar attributes, and merges the zip and
    /// neighborhood nodes plus their edges when those values are present.
    /// Re-running with the same record leaves the graph unchanged.
    async fn merge_property(&self, record: &PropertyRecord) -> GraphResult<()>;

    async fn counts(&self) -> GraphResult<GraphCounts>;

    /// Release the session; further calls may fail
    async fn close(&self) -> GraphResult<()>;
}
