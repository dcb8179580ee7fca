//! HTTP behavior of the Pinecone catalog client against a mock server

use propgraph_catalog::PineconeCatalog;
use propgraph_config::SourceConfig;
use propgraph_core::{SourceCatalog, SourceError};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn catalog_for(server: &MockServer, fetch_batch_size: usize) -> PineconeCatalog {
    let config = SourceConfig {
        host: server.uri(),
        api_key: Some("test-key".to_string()),
        fetch_batch_size,
        timeout_secs: 5,
        ..Default::default()
    };
    PineconeCatalog::new(&config).unwrap()
}

#[tokio::test]
async fn test_list_page_sends_cursor_and_reads_next_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/vectors/list"))
        .and(query_param("namespace", "homes"))
        .and(query_param("limit", "2"))
        .and(query_param("paginationToken", "tok-1"))
        .and(header("Api-Key", "test-key"))
        .and(header("X-Pinecone-API-Version", "2024-07"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "vectors": [{ "id": "a" }, { "id": "b" }],
            "pagination": { "next": "tok-2" },
            "namespace": "homes",
            "usage": { "readUnits": 1 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let catalog = catalog_for(&server, 100);
    let page = catalog.list_page("homes", Some("tok-1"), 2).await.unwrap();

    assert_eq!(page.ids, vec!["a", "b"]);
    assert_eq!(page.next_cursor.as_deref(), Some("tok-2"));
}

#[tokio::test]
async fn test_last_page_has_no_cursor() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/vectors/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "vectors": [{ "id": "z" }],
            "namespace": "homes"
        })))
        .mount(&server)
        .await;

    let catalog = catalog_for(&server, 100);
    let page = catalog.list_page("homes", None, 100).await.unwrap();

    assert_eq!(page.ids, vec!["z"]);
    assert_eq!(page.next_cursor, None);
}

#[tokio::test]
async fn test_rejected_token_maps_to_invalid_cursor() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/vectors/list"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 3,
            "message": "Invalid pagination token",
            "details": []
        })))
        .mount(&server)
        .await;

    let catalog = catalog_for(&server, 100);

    let err = catalog
        .list_page("homes", Some("stale"), 10)
        .await
        .unwrap_err();
    assert!(err.is_invalid_cursor());

    // Without a cursor the same response is an ordinary API error
    let err = catalog.list_page("homes", None, 10).await.unwrap_err();
    assert!(matches!(err, SourceError::Api { status: 400, .. }));
}

#[tokio::test]
async fn test_server_error_is_reported_with_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/vectors/list"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let catalog = catalog_for(&server, 100);
    let err = catalog.list_page("homes", None, 10).await.unwrap_err();

    match err {
        SourceError::Api { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "unavailable");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_fetch_metadata_is_chunked_and_skips_vectors_without_metadata() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/vectors/fetch"))
        .and(query_param("namespace", "homes"))
        .and(query_param("ids", "a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "vectors": {
                "a": { "id": "a", "values": [], "metadata": { "zpid": 1.0 } },
                "b": { "id": "b", "values": [] }
            },
            "namespace": "homes"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/vectors/fetch"))
        .and(query_param("ids", "c"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "vectors": {
                "c": { "id": "c", "metadata": { "zpid": 3.0, "city": "Tulsa" } }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let catalog = catalog_for(&server, 2);
    let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let metadata = catalog.fetch_metadata("homes", &ids).await.unwrap();

    assert_eq!(metadata.len(), 2);
    assert_eq!(metadata["a"]["zpid"], json!(1.0));
    assert_eq!(metadata["c"]["city"], json!("Tulsa"));
    assert!(!metadata.contains_key("b"));
}

#[tokio::test]
async fn test_malformed_body_is_a_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/vectors/list"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let catalog = catalog_for(&server, 100);
    let err = catalog.list_page("homes", None, 10).await.unwrap_err();
    assert!(matches!(err, SourceError::Parse(_)));
}
