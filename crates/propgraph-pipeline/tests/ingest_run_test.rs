//! End-to-end runs of the ingest state machine against in-memory mocks

use propgraph_core::test_support::mocks::{
    sample_metadata, MockCheckpointStore, MockGraphConnector, MockSourceCatalog,
};
use propgraph_core::{Checkpoint, GraphError, RecordLimit, ResetMode, SourceError};
use propgraph_pipeline::{RetryPolicy, RunSession, RunSettings, RunState, RunSummary};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const NS: &str = "listings";

struct Harness {
    catalog: MockSourceCatalog,
    graph: MockGraphConnector,
    checkpoints: MockCheckpointStore,
    settings: RunSettings,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl Harness {
    fn new(catalog: MockSourceCatalog) -> Self {
        Self {
            catalog,
            graph: MockGraphConnector::new(),
            checkpoints: MockCheckpointStore::new(),
            settings: RunSettings {
                namespace: NS.to_string(),
                page_size: 2,
                limit: RecordLimit::Unbounded,
                resume: true,
                reset: ResetMode::None,
                start_cursor: None,
                operation_timeout: Duration::from_secs(5),
            },
            policy: RetryPolicy {
                max_attempts: 5,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(8),
            },
            cancel: CancellationToken::new(),
        }
    }

    fn with_checkpoint(mut self, checkpoint: Checkpoint) -> Self {
        self.checkpoints = MockCheckpointStore::with_checkpoint(checkpoint);
        self
    }

    async fn run(&self) -> RunSummary {
        RunSession::new(
            self.settings.clone(),
            Arc::new(self.catalog.clone()),
            Arc::new(self.graph.clone()),
            Arc::new(self.checkpoints.clone()),
            self.policy,
            self.cancel.clone(),
        )
        .run()
        .await
    }
}

#[tokio::test]
async fn test_retried_page_completes_with_final_checkpoint() {
    let harness = Harness::new(MockSourceCatalog::with_properties(6));
    harness
        .graph
        .fail_merge(3, GraphError::SessionExpired("server restarted".to_string()), 2);

    let summary = harness.run().await;

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(summary.written, 6);
    assert_eq!(summary.pages, 3);
    assert_eq!(summary.retries, 2);
    assert_eq!(summary.reconnects, 2);

    let data = harness.graph.data();
    assert_eq!(data.properties.len(), 6);
    assert_eq!(data.zips.len(), 3);
    assert_eq!(data.neighborhoods.len(), 2);
    assert_eq!(data.in_zip.len(), 6);

    let checkpoint = harness.checkpoints.current(NS).unwrap();
    assert_eq!(checkpoint.processed, 6);
    assert_eq!(checkpoint.next_token, None);
    assert_eq!(checkpoint.page_size, 2);

    let saved: Vec<u64> = harness.checkpoints.history().iter().map(|c| c.processed).collect();
    assert_eq!(saved, vec![2, 4, 6]);
    assert_eq!(harness.graph.stats().connects, 3);
}

#[tokio::test]
async fn test_malformed_address_is_ingested_without_edges() {
    let catalog = MockSourceCatalog::new();
    catalog.push_record("a", Some(json!({ "zpid": 10, "address": "{not valid json" })));
    catalog.push_record("b", Some(sample_metadata(11)));
    let harness = Harness::new(catalog);

    let summary = harness.run().await;

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.written, 2);
    assert_eq!(summary.malformed, 1);
    let data = harness.graph.data();
    let node = &data.properties[&10];
    assert!(node.get("zipcode").is_none());
    assert!(node.get("neighborhood").is_none());
    assert!(!data.in_zip.iter().any(|(zpid, _)| *zpid == 10));
    assert!(!data.in_neighborhood.iter().any(|(zpid, _)| *zpid == 10));
}

#[tokio::test]
async fn test_records_without_zpid_are_excluded() {
    let catalog = MockSourceCatalog::new();
    catalog.push_record("a", Some(sample_metadata(1)));
    catalog.push_record("b", Some(json!({ "city": "Springfield" })));
    catalog.push_record("c", None);
    catalog.push_record("d", Some(sample_metadata(4)));
    let harness = Harness::new(catalog);

    let summary = harness.run().await;

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.written, 2);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.skipped.get("missing_zpid"), Some(&1));
    assert_eq!(summary.skipped.get("missing_metadata"), Some(&1));
    assert_eq!(harness.graph.data().properties.len(), 2);
    assert_eq!(harness.checkpoints.current(NS).unwrap().processed, 2);
}

#[tokio::test]
async fn test_exhausted_retries_abort_and_keep_last_checkpoint() {
    let harness = Harness::new(MockSourceCatalog::with_properties(6));
    harness
        .graph
        .fail_merge(4, GraphError::Transient("deadlock".to_string()), 5);

    let summary = harness.run().await;

    assert_eq!(summary.state, RunState::Aborted);
    assert_eq!(summary.exit_code(), 1);
    let message = summary.error.unwrap();
    assert!(message.contains("property 4"));
    assert!(message.contains("page 2"));

    let checkpoint = harness.checkpoints.current(NS).unwrap();
    assert_eq!(checkpoint.processed, 2);
    assert_eq!(checkpoint.next_token.as_deref(), Some("cursor-2"));

    let attempts = harness.graph.stats().merge_attempts;
    assert_eq!(attempts.iter().filter(|z| **z == 4).count(), 5);
}

#[tokio::test]
async fn test_fatal_write_aborts_without_retry() {
    let harness = Harness::new(MockSourceCatalog::with_properties(4));
    harness
        .graph
        .fail_merge(1, GraphError::Constraint("duplicate zpid".to_string()), 1);

    let summary = harness.run().await;

    assert_eq!(summary.state, RunState::Aborted);
    assert_eq!(summary.retries, 0);
    assert_eq!(harness.graph.stats().merge_attempts, vec![1]);
    assert!(harness.checkpoints.history().is_empty());
}

#[tokio::test]
async fn test_resume_continues_from_checkpoint() {
    let harness = Harness::new(MockSourceCatalog::with_properties(6)).with_checkpoint(
        Checkpoint::new(NS, Some(MockSourceCatalog::cursor_for(4)), 4, 2),
    );

    let summary = harness.run().await;

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.written, 2);
    assert_eq!(summary.processed, 6);
    assert_eq!(harness.graph.stats().merge_attempts, vec![5, 6]);
    assert_eq!(harness.catalog.list_calls()[0].cursor.as_deref(), Some("cursor-4"));
}

#[tokio::test]
async fn test_checkpoint_for_other_namespace_is_ignored() {
    let harness = Harness::new(MockSourceCatalog::with_properties(4)).with_checkpoint(
        Checkpoint::new("elsewhere", Some(MockSourceCatalog::cursor_for(2)), 2, 2),
    );

    let summary = harness.run().await;

    assert_eq!(summary.written, 4);
    assert_eq!(harness.catalog.list_calls()[0].cursor, None);
}

#[tokio::test]
async fn test_explicit_cursor_overrides_checkpoint() {
    let mut harness = Harness::new(MockSourceCatalog::with_properties(6)).with_checkpoint(
        Checkpoint::new(NS, Some(MockSourceCatalog::cursor_for(2)), 2, 2),
    );
    harness.settings.start_cursor = Some(MockSourceCatalog::cursor_for(4));

    let summary = harness.run().await;

    assert_eq!(summary.written, 2);
    assert_eq!(summary.processed, 2);
    assert_eq!(harness.graph.stats().merge_attempts, vec![5, 6]);
}

#[tokio::test]
async fn test_rejected_cursor_falls_back_to_skip_by_count() {
    let stale = "expired-token";
    let catalog = MockSourceCatalog::with_properties(6);
    catalog.invalidate_cursor(stale);
    let harness =
        Harness::new(catalog).with_checkpoint(Checkpoint::new(NS, Some(stale.to_string()), 4, 2));

    let summary = harness.run().await;

    assert_eq!(summary.state, RunState::Completed);
    assert!(summary.fallback_used);
    assert_eq!(harness.graph.stats().merge_attempts, vec![5, 6]);
    assert_eq!(harness.checkpoints.current(NS).unwrap().processed, 6);
}

#[tokio::test]
async fn test_rejected_explicit_cursor_aborts() {
    let catalog = MockSourceCatalog::with_properties(4);
    catalog.invalidate_cursor("bogus");
    let mut harness = Harness::new(catalog);
    harness.settings.start_cursor = Some("bogus".to_string());

    let summary = harness.run().await;

    assert_eq!(summary.state, RunState::Aborted);
    assert!(!summary.fallback_used);
    assert!(summary.error.unwrap().contains("Invalid pagination cursor"));
    assert!(harness.graph.data().properties.is_empty());
}

#[tokio::test]
async fn test_record_limit_stops_mid_page() {
    let mut harness = Harness::new(MockSourceCatalog::with_properties(10));
    harness.settings.limit = RecordLimit::Max(3);

    let summary = harness.run().await;

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.written, 3);
    let limits: Vec<usize> = harness.catalog.list_calls().iter().map(|c| c.limit).collect();
    assert_eq!(limits, vec![2, 1]);
    let checkpoint = harness.checkpoints.current(NS).unwrap();
    assert_eq!(checkpoint.processed, 3);
    assert_eq!(checkpoint.next_token.as_deref(), Some("cursor-3"));
}

#[tokio::test]
async fn test_checkpoint_failures_do_not_abort() {
    let harness = Harness::new(MockSourceCatalog::with_properties(4));
    harness.checkpoints.set_fail_saves(true);

    let summary = harness.run().await;

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.written, 4);
    assert_eq!(summary.checkpoint_failures, 2);
    assert!(harness.checkpoints.current(NS).is_none());
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let mut harness = Harness::new(MockSourceCatalog::with_properties(5));
    harness.settings.resume = false;

    harness.run().await;
    let first = harness.graph.data();
    let summary = harness.run().await;

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(harness.graph.data(), first);
}

#[tokio::test]
async fn test_completed_checkpoint_starts_fresh_pass() {
    let harness = Harness::new(MockSourceCatalog::with_properties(4))
        .with_checkpoint(Checkpoint::new(NS, None, 4, 2));

    let summary = harness.run().await;

    assert_eq!(summary.written, 4);
    assert_eq!(harness.catalog.list_calls()[0].cursor, None);
}

#[tokio::test]
async fn test_scoped_reset_ignores_checkpoint_and_keeps_foreign_nodes() {
    let mut harness = Harness::new(MockSourceCatalog::with_properties(4)).with_checkpoint(
        Checkpoint::new(NS, Some(MockSourceCatalog::cursor_for(2)), 2, 2),
    );
    harness.graph.add_foreign_nodes(3);
    harness.settings.reset = ResetMode::Scoped;

    let summary = harness.run().await;

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.written, 4);
    let stats = harness.graph.stats();
    assert_eq!(stats.resets, vec![ResetMode::Scoped]);
    assert_eq!(harness.graph.data().foreign_nodes, 3);
    assert_eq!(harness.catalog.list_calls()[0].cursor, None);
}

#[tokio::test]
async fn test_schema_failure_aborts_before_paging() {
    let harness = Harness::new(MockSourceCatalog::with_properties(2));
    harness
        .graph
        .fail_next_schema(GraphError::Schema("unsupported index".to_string()));

    let summary = harness.run().await;

    assert_eq!(summary.state, RunState::Aborted);
    assert!(summary.error.unwrap().starts_with("Schema bootstrap failed"));
    assert!(harness.catalog.list_calls().is_empty());
}

#[tokio::test]
async fn test_source_failure_aborts() {
    let harness = Harness::new(MockSourceCatalog::with_properties(4));
    harness
        .catalog
        .fail_next_fetch(SourceError::Api {
            status: 500,
            message: "internal".to_string(),
        });

    let summary = harness.run().await;

    assert_eq!(summary.state, RunState::Aborted);
    assert!(summary.error.unwrap().contains("page 1"));
    assert!(harness.checkpoints.history().is_empty());
}

#[tokio::test]
async fn test_cancelled_run_is_interrupted() {
    let harness = Harness::new(MockSourceCatalog::with_properties(4));
    harness.cancel.cancel();

    let summary = harness.run().await;

    assert_eq!(summary.state, RunState::Interrupted);
    assert_eq!(summary.exit_code(), 130);
    assert_eq!(summary.pages, 0);
    assert_eq!(harness.graph.stats().schema_calls, 1);
    assert_eq!(harness.graph.stats().closes, 1);
}

#[tokio::test]
async fn test_empty_source_completes() {
    let harness = Harness::new(MockSourceCatalog::new());

    let summary = harness.run().await;

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.pages, 0);
    assert!(harness.checkpoints.history().is_empty());
}
