//! Source catalog abstraction
//!
//! The catalog stores property records as ids plus free-form metadata and
//! lists them in cursor-paginated pages. Implementations live outside core
//! (the HTTP client in `propgraph-catalog`, mocks in [`crate::test_support`]).

use crate::error::SourceResult;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Raw metadata for one catalog record
pub type RawMetadata = Value;

/// One page of record ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdPage {
    pub ids: Vec<String>,
    /// Cursor for the following page; `None` when this is the last one
    pub next_cursor: Option<String>,
}

impl IdPage {
    /// The page carries no ids and no continuation
    pub fn is_end(&self) -> bool {
        self.ids.is_empty() && self.next_cursor.is_none()
    }
}

/// Read-only access to a paginated record catalog
#[async_trait]
pub trait SourceCatalog: Send + Sync {
    /// List up to `limit` ids starting at `cursor` (`None` = beginning)
    ///
    /// A cursor the catalog no longer accepts must surface as
    /// [`SourceError::InvalidCursor`](crate::SourceError::InvalidCursor).
    async fn list_page(
        &self,
        namespace: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> SourceResult<IdPage>;

    /// Fetch metadata for `ids`; ids without metadata are simply absent
    async fn fetch_metadata(
        &self,
        namespace: &str,
        ids: &[String],
    ) -> SourceResult<HashMap<String, RawMetadata>>;
}
