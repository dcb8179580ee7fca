//! Mock Implementations for Testing
//!
//! In-memory stand-ins for the source catalog, the graph backend and the
//! checkpoint store. Each one records what was asked of it and can be told to
//! fail, so pipeline tests can drive every retry, fallback and abort path
//! without a network or a database.
//!
//! # Examples
//!
//! ```rust
//! use propgraph_core::test_support::mocks::{MockGraphConnector, MockSourceCatalog};
//! use propgraph_core::{GraphConnector, GraphError, SourceCatalog};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = MockSourceCatalog::with_properties(4);
//! let page = catalog.list_page("ns", None, 3).await?;
//! assert_eq!(page.ids.len(), 3);
//!
//! let graph = MockGraphConnector::new();
//! graph.fail_merge(2, GraphError::Transient("deadlock".into()), 1);
//! let session = graph.connect().await?;
//! session.ensure_schema().await?;
//! # Ok(())
//! # }
//! ```

use crate::catalog::{IdPage, RawMetadata, SourceCatalog};
use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::error::{
    CheckpointError, CheckpointResult, GraphError, GraphResult, SourceError, SourceResult,
};
use crate::graph::{GraphConnector, GraphCounts, GraphSession};
use crate::property::PropertyRecord;
use async_trait::async_trait;
use propgraph_config::ResetMode;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const CURSOR_PREFIX: &str = "cursor-";

// ============================================================================
// Source catalog
// ============================================================================

/// One `list_page` call as seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCall {
    pub cursor: Option<String>,
    pub limit: usize,
}

#[derive(Debug, Default)]
struct MockCatalogState {
    records: Vec<(String, Option<RawMetadata>)>,
    invalid_cursors: HashSet<String>,
    list_failures: VecDeque<SourceError>,
    fetch_failures: VecDeque<SourceError>,
    list_calls: Vec<ListCall>,
    fetch_calls: usize,
}

/// Catalog backed by an ordered list of records
///
/// Cursors are `cursor-<offset>`; [`MockSourceCatalog::cursor_for`] builds
/// them so tests can seed checkpoints.
#[derive(Debug, Clone, Default)]
pub struct MockSourceCatalog {
    state: Arc<Mutex<MockCatalogState>>,
}

impl MockSourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding `count` well-formed records with zpids `1..=count`
    pub fn with_properties(count: usize) -> Self {
        let catalog = Self::new();
        for zpid in 1..=count {
            catalog.push_record(format!("prop-{}", zpid), Some(sample_metadata(zpid as i64)));
        }
        catalog
    }

    /// Append a record; `None` metadata lists the id but fetches nothing
    pub fn push_record(&self, id: impl Into<String>, metadata: Option<RawMetadata>) {
        self.state
            .lock()
            .unwrap()
            .records
            .push((id.into(), metadata));
    }

    /// Cursor that starts listing at `offset`
    pub fn cursor_for(offset: usize) -> String {
        format!("{}{}", CURSOR_PREFIX, offset)
    }

    /// Reject `cursor` with [`SourceError::InvalidCursor`] from now on
    pub fn invalidate_cursor(&self, cursor: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .invalid_cursors
            .insert(cursor.into());
    }

    /// Fail the next `list_page` call with `error`
    pub fn fail_next_list(&self, error: SourceError) {
        self.state.lock().unwrap().list_failures.push_back(error);
    }

    /// Fail the next `fetch_metadata` call with `error`
    pub fn fail_next_fetch(&self, error: SourceError) {
        self.state.lock().unwrap().fetch_failures.push_back(error);
    }

    pub fn list_calls(&self) -> Vec<ListCall> {
        self.state.lock().unwrap().list_calls.clone()
    }

    pub fn fetch_calls(&self) -> usize {
        self.state.lock().unwrap().fetch_calls
    }
}

#[async_trait]
impl SourceCatalog for MockSourceCatalog {
    async fn list_page(
        &self,
        _namespace: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> SourceResult<IdPage> {
        let mut state = self.state.lock().unwrap();
        state.list_calls.push(ListCall {
            cursor: cursor.map(str::to_string),
            limit,
        });

        if let Some(error) = state.list_failures.pop_front() {
            return Err(error);
        }

        let offset = match cursor {
            None => 0,
            Some(token) if state.invalid_cursors.contains(token) => {
                return Err(SourceError::InvalidCursor(token.to_string()))
            }
            Some(token) => token
                .strip_prefix(CURSOR_PREFIX)
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| SourceError::InvalidCursor(token.to_string()))?,
        };

        let total = state.records.len();
        let start = offset.min(total);
        let end = (start + limit).min(total);
        let ids = state.records[start..end]
            .iter()
            .map(|(id, _)| id.clone())
            .collect();
        let next_cursor = (end < total).then(|| Self::cursor_for(end));

        Ok(IdPage { ids, next_cursor })
    }

    async fn fetch_metadata(
        &self,
        _namespace: &str,
        ids: &[String],
    ) -> SourceResult<HashMap<String, RawMetadata>> {
        let mut state = self.state.lock().unwrap();
        state.fetch_calls += 1;

        if let Some(error) = state.fetch_failures.pop_front() {
            return Err(error);
        }

        let wanted: HashSet<&String> = ids.iter().collect();
        Ok(state
            .records
            .iter()
            .filter(|(id, _)| wanted.contains(id))
            .filter_map(|(id, meta)| meta.clone().map(|m| (id.clone(), m)))
            .collect())
    }
}

/// Well-formed metadata for `zpid` in the catalog's native shape
pub fn sample_metadata(zpid: i64) -> Value {
    let address = json!({
        "streetAddress": format!("{} Main St", zpid),
        "city": "Springfield",
        "state": "IL",
        "zipcode": format!("6270{}", zpid % 3),
        "neighborhood": if zpid % 2 == 0 { "Downtown" } else { "Riverside" },
    });
    json!({
        "zpid": zpid as f64,
        "city": "Springfield",
        "state": "IL",
        "address": address.to_string(),
        "price": 250000.0 + zpid as f64,
        "bedrooms": 3.0,
        "bathrooms": 2.0,
        "homeType": "SINGLE_FAMILY",
    })
}

// ============================================================================
// Graph backend
// ============================================================================

/// Contents of the mock graph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockGraphData {
    pub properties: BTreeMap<i64, Map<String, Value>>,
    pub zips: BTreeSet<String>,
    pub neighborhoods: BTreeSet<String>,
    pub in_zip: BTreeSet<(i64, String)>,
    pub in_neighborhood: BTreeSet<(i64, String)>,
    /// Nodes outside the property model; only a full reset removes them
    pub foreign_nodes: u64,
}

/// Operation counters for the mock graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockGraphStats {
    pub connects: usize,
    pub closes: usize,
    pub schema_calls: usize,
    pub resets: Vec<ResetMode>,
    /// Every merge attempt, failed or not, in order
    pub merge_attempts: Vec<i64>,
}

#[derive(Debug)]
struct MergeFailure {
    error: GraphError,
    remaining: u32,
}

#[derive(Debug, Default)]
struct MockGraphState {
    data: MockGraphData,
    stats: MockGraphStats,
    merge_failures: HashMap<i64, MergeFailure>,
    connect_failures: VecDeque<GraphError>,
    schema_failures: VecDeque<GraphError>,
    merge_delay: Option<Duration>,
}

/// Connector for an in-memory graph shared by all its sessions
///
/// An injected retriable failure also kills the session it happened on, so
/// the next call on that session fails with [`GraphError::SessionExpired`].
#[derive(Debug, Clone, Default)]
pub struct MockGraphConnector {
    state: Arc<Mutex<MockGraphState>>,
}

impl MockGraphConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` merges of `zpid` with `error`
    pub fn fail_merge(&self, zpid: i64, error: GraphError, times: u32) {
        self.state.lock().unwrap().merge_failures.insert(
            zpid,
            MergeFailure {
                error,
                remaining: times,
            },
        );
    }

    /// Fail the next `connect` call with `error`
    pub fn fail_next_connect(&self, error: GraphError) {
        self.state.lock().unwrap().connect_failures.push_back(error);
    }

    /// Fail the next `ensure_schema` call with `error`
    pub fn fail_next_schema(&self, error: GraphError) {
        self.state.lock().unwrap().schema_failures.push_back(error);
    }

    /// Sleep this long inside every merge
    pub fn set_merge_delay(&self, delay: Duration) {
        self.state.lock().unwrap().merge_delay = Some(delay);
    }

    /// Add nodes that are not part of the property model
    pub fn add_foreign_nodes(&self, count: u64) {
        self.state.lock().unwrap().data.foreign_nodes += count;
    }

    pub fn data(&self) -> MockGraphData {
        self.state.lock().unwrap().data.clone()
    }

    pub fn stats(&self) -> MockGraphStats {
        self.state.lock().unwrap().stats.clone()
    }
}

#[async_trait]
impl GraphConnector for MockGraphConnector {
    async fn connect(&self) -> GraphResult<Box<dyn GraphSession>> {
        let mut state = self.state.lock().unwrap();
        state.stats.connects += 1;
        if let Some(error) = state.connect_failures.pop_front() {
            return Err(error);
        }
        Ok(Box::new(MockGraphSession {
            state: Arc::clone(&self.state),
            alive: Arc::new(AtomicBool::new(true)),
        }))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Session on a [`MockGraphConnector`]
#[derive(Debug)]
pub struct MockGraphSession {
    state: Arc<Mutex<MockGraphState>>,
    alive: Arc<AtomicBool>,
}

impl MockGraphSession {
    fn check_alive(&self) -> GraphResult<()> {
        if self.alive.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(GraphError::SessionExpired("mock session closed".to_string()))
        }
    }
}

#[async_trait]
impl GraphSession for MockGraphSession {
    async fn ensure_schema(&self) -> GraphResult<()> {
        self.check_alive()?;
        let mut state = self.state.lock().unwrap();
        state.stats.schema_calls += 1;
        match state.schema_failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn reset(&self, mode: ResetMode) -> GraphResult<()> {
        self.check_alive()?;
        let mut state = self.state.lock().unwrap();
        state.stats.resets.push(mode);
        match mode {
            ResetMode::None => {}
            ResetMode::Scoped => {
                let foreign = state.data.foreign_nodes;
                state.data = MockGraphData {
                    foreign_nodes: foreign,
                    ..Default::default()
                };
            }
            ResetMode::All => state.data = MockGraphData::default(),
        }
        Ok(())
    }

    async fn merge_property(&self, record: &PropertyRecord) -> GraphResult<()> {
        self.check_alive()?;

        let delay = self.state.lock().unwrap().merge_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.stats.merge_attempts.push(record.zpid);

        if let Some(failure) = state.merge_failures.get_mut(&record.zpid) {
            if failure.remaining > 0 {
                failure.remaining -= 1;
                let error = failure.error.clone();
                if error.is_retryable() {
                    self.alive.store(false, Ordering::SeqCst);
                }
                return Err(error);
            }
        }

        let data = &mut state.data;
        data.properties.insert(record.zpid, record.properties());
        if let Some(code) = &record.zipcode {
            data.zips.insert(code.clone());
            data.in_zip.insert((record.zpid, code.clone()));
        }
        if let Some(name) = &record.neighborhood {
            data.neighborhoods.insert(name.clone());
            data.in_neighborhood.insert((record.zpid, name.clone()));
        }
        Ok(())
    }

    async fn counts(&self) -> GraphResult<GraphCounts> {
        self.check_alive()?;
        let state = self.state.lock().unwrap();
        let data = &state.data;
        Ok(GraphCounts {
            properties: data.properties.len() as u64,
            zips: data.zips.len() as u64,
            neighborhoods: data.neighborhoods.len() as u64,
            in_zip: data.in_zip.len() as u64,
            in_neighborhood: data.in_neighborhood.len() as u64,
        })
    }

    async fn close(&self) -> GraphResult<()> {
        if self.alive.swap(false, Ordering::SeqCst) {
            self.state.lock().unwrap().stats.closes += 1;
        }
        Ok(())
    }
}

// ============================================================================
// Checkpoint store
// ============================================================================

#[derive(Debug, Default)]
struct MockCheckpointState {
    checkpoints: HashMap<String, Checkpoint>,
    history: Vec<Checkpoint>,
    fail_saves: bool,
    fail_loads: bool,
}

/// Checkpoint store that keeps every save and can refuse writes
#[derive(Debug, Clone, Default)]
pub struct MockCheckpointStore {
    state: Arc<Mutex<MockCheckpointState>>,
}

impl MockCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checkpoint(checkpoint: Checkpoint) -> Self {
        let store = Self::new();
        store
            .state
            .lock()
            .unwrap()
            .checkpoints
            .insert(checkpoint.namespace.clone(), checkpoint);
        store
    }

    pub fn set_fail_saves(&self, enabled: bool) {
        self.state.lock().unwrap().fail_saves = enabled;
    }

    pub fn set_fail_loads(&self, enabled: bool) {
        self.state.lock().unwrap().fail_loads = enabled;
    }

    /// Current checkpoint for `namespace`
    pub fn current(&self, namespace: &str) -> Option<Checkpoint> {
        self.state.lock().unwrap().checkpoints.get(namespace).cloned()
    }

    /// Every successful save, oldest first
    pub fn history(&self) -> Vec<Checkpoint> {
        self.state.lock().unwrap().history.clone()
    }
}

#[async_trait]
impl CheckpointStore for MockCheckpointStore {
    async fn load(&self, namespace: &str) -> CheckpointResult<Option<Checkpoint>> {
        let state = self.state.lock().unwrap();
        if state.fail_loads {
            return Err(CheckpointError::Storage("simulated load failure".to_string()));
        }
        Ok(state.checkpoints.get(namespace).cloned())
    }

    async fn save(&self, checkpoint: &Checkpoint) -> CheckpointResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_saves {
            return Err(CheckpointError::Storage("simulated save failure".to_string()));
        }
        state
            .checkpoints
            .insert(checkpoint.namespace.clone(), checkpoint.clone());
        state.history.push(checkpoint.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_catalog_pages_through_records() {
        let catalog = MockSourceCatalog::with_properties(5);

        let first = catalog.list_page("ns", None, 2).await.unwrap();
        assert_eq!(first.ids, vec!["prop-1", "prop-2"]);
        assert_eq!(first.next_cursor.as_deref(), Some("cursor-2"));

        let last = catalog.list_page("ns", Some("cursor-4"), 2).await.unwrap();
        assert_eq!(last.ids, vec!["prop-5"]);
        assert_eq!(last.next_cursor, None);

        catalog.invalidate_cursor("cursor-2");
        let err = catalog
            .list_page("ns", Some("cursor-2"), 2)
            .await
            .unwrap_err();
        assert!(err.is_invalid_cursor());
    }

    #[tokio::test]
    async fn test_retriable_failure_expires_session() {
        let graph = MockGraphConnector::new();
        graph.fail_merge(1, GraphError::Transient("deadlock".to_string()), 1);

        let session = graph.connect().await.unwrap();
        let record = PropertyRecord::new(1);
        assert!(session.merge_property(&record).await.is_err());
        assert!(matches!(
            session.merge_property(&record).await,
            Err(GraphError::SessionExpired(_))
        ));

        let fresh = graph.connect().await.unwrap();
        fresh.merge_property(&record).await.unwrap();
        assert_eq!(graph.data().properties.len(), 1);
        assert_eq!(graph.stats().connects, 2);
    }
}
