//! SurrealDB backend behavior on the in-memory engine

use propgraph_core::{
    Checkpoint, CheckpointStore, GraphConnector, GraphCounts, GraphError, PropertyRecord,
    ResetMode,
};
use propgraph_surrealdb::SurrealGraphConnector;

fn record(zpid: i64, zip: Option<&str>, neighborhood: Option<&str>) -> PropertyRecord {
    let mut record = PropertyRecord::new(zpid);
    record.city = Some("Portland".to_string());
    record.state = Some("OR".to_string());
    record.price = Some(500_000.0 + zpid as f64);
    record.zipcode = zip.map(str::to_string);
    record.neighborhood = neighborhood.map(str::to_string);
    record
}

#[tokio::test]
async fn test_merge_is_idempotent() {
    let connector = SurrealGraphConnector::new_memory().await.unwrap();
    let session = connector.connect().await.unwrap();
    session.ensure_schema().await.unwrap();
    session.ensure_schema().await.unwrap();

    let first = record(1, Some("97201"), Some("Goose Hollow"));
    session.merge_property(&first).await.unwrap();
    session.merge_property(&first).await.unwrap();
    session
        .merge_property(&record(2, Some("97201"), None))
        .await
        .unwrap();

    let counts = session.counts().await.unwrap();
    assert_eq!(
        counts,
        GraphCounts {
            properties: 2,
            zips: 1,
            neighborhoods: 1,
            in_zip: 2,
            in_neighborhood: 1,
        }
    );
}

#[tokio::test]
async fn test_reingestion_overwrites_attributes() {
    let connector = SurrealGraphConnector::new_memory().await.unwrap();
    let session = connector.connect().await.unwrap();
    session.ensure_schema().await.unwrap();

    let mut rec = record(7, None, None);
    session.merge_property(&rec).await.unwrap();
    rec.price = Some(1.0);
    rec.city = None;
    session.merge_property(&rec).await.unwrap();

    let mut response = connector
        .db()
        .query("SELECT VALUE price FROM type::thing('property', 7)")
        .await
        .unwrap();
    let prices: Vec<f64> = response.take(0).unwrap();
    assert_eq!(prices, vec![1.0]);

    let mut response = connector
        .db()
        .query("SELECT VALUE city FROM type::thing('property', 7)")
        .await
        .unwrap();
    let cities: Vec<Option<String>> = response.take(0).unwrap();
    assert_eq!(cities, vec![None]);
}

#[tokio::test]
async fn test_scoped_reset_keeps_foreign_tables() {
    let connector = SurrealGraphConnector::new_memory().await.unwrap();
    let session = connector.connect().await.unwrap();
    session.ensure_schema().await.unwrap();
    session
        .merge_property(&record(1, Some("10001"), Some("Chelsea")))
        .await
        .unwrap();
    connector
        .db()
        .query("CREATE note:keep SET title = 'unrelated'")
        .await
        .unwrap()
        .check()
        .unwrap();

    session.reset(ResetMode::Scoped).await.unwrap();

    assert_eq!(session.counts().await.unwrap(), GraphCounts::default());
    let mut response = connector
        .db()
        .query("SELECT VALUE title FROM note")
        .await
        .unwrap();
    let titles: Vec<String> = response.take(0).unwrap();
    assert_eq!(titles, vec!["unrelated".to_string()]);
}

#[tokio::test]
async fn test_full_reset_clears_everything_but_checkpoints() {
    let connector = SurrealGraphConnector::new_memory().await.unwrap();
    let session = connector.connect().await.unwrap();
    session.ensure_schema().await.unwrap();
    session
        .merge_property(&record(1, Some("10001"), None))
        .await
        .unwrap();
    connector
        .db()
        .query("CREATE note:gone SET title = 'unrelated'")
        .await
        .unwrap()
        .check()
        .unwrap();

    let store = connector.checkpoint_store();
    store
        .save(&Checkpoint::new("ns", Some("tok".to_string()), 1, 1))
        .await
        .unwrap();

    session.reset(ResetMode::All).await.unwrap();

    assert_eq!(session.counts().await.unwrap(), GraphCounts::default());
    let mut response = connector.db().query("SELECT * FROM note").await.unwrap();
    let notes: Vec<serde_json::Value> = response.take(0).unwrap();
    assert!(notes.is_empty());
    assert!(store.load("ns").await.unwrap().is_some());
}

#[tokio::test]
async fn test_closed_session_reports_expiry() {
    let connector = SurrealGraphConnector::new_memory().await.unwrap();
    let session = connector.connect().await.unwrap();
    session.close().await.unwrap();

    let err = session
        .merge_property(&record(1, None, None))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::SessionExpired(_)));
    assert!(err.is_retryable());

    // A new session on the same connector works
    let fresh = connector.connect().await.unwrap();
    fresh.merge_property(&record(1, None, None)).await.unwrap();
}

#[tokio::test]
async fn test_checkpoint_store_round_trip() {
    let connector = SurrealGraphConnector::new_memory().await.unwrap();
    let store = connector.checkpoint_store();

    assert!(store.load("homes").await.unwrap().is_none());

    let saved = Checkpoint::new("homes", Some("cursor-40".to_string()), 40, 20);
    store.save(&saved).await.unwrap();
    let done = Checkpoint::new("homes", None, 55, 20);
    store.save(&done).await.unwrap();

    let loaded = store.load("homes").await.unwrap().unwrap();
    assert_eq!(loaded.processed, 55);
    assert_eq!(loaded.next_token, None);
    assert_eq!(loaded.page_size, 20);
    assert_eq!(loaded.timestamp.timestamp(), done.timestamp.timestamp());
    assert!(store.load("other").await.unwrap().is_none());
}
