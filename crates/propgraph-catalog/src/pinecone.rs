//! Pinecone data-plane client
//!
//! Lists vector ids with `GET /vectors/list` and reads their metadata with
//! `GET /vectors/fetch`. Vectors themselves are never requested.

use async_trait::async_trait;
use propgraph_config::SourceConfig;
use propgraph_core::{IdPage, RawMetadata, SourceCatalog, SourceError, SourceResult};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

const API_KEY_HEADER: &str = "Api-Key";
const API_VERSION_HEADER: &str = "X-Pinecone-API-Version";

/// Catalog client for one Pinecone index
#[derive(Debug, Clone)]
pub struct PineconeCatalog {
    client: Client,
    base_url: String,
    fetch_batch_size: usize,
    timeout: Duration,
}

impl PineconeCatalog {
    /// Build a client from source settings; the API key is required
    pub fn new(config: &SourceConfig) -> SourceResult<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| SourceError::Network("catalog API key is not configured".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, header_value(api_key)?);
        headers.insert(API_VERSION_HEADER, header_value(&config.api_version)?);

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| SourceError::Network(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = normalize_host(&config.host);
        info!("Created catalog client for {}", base_url);

        Ok(Self {
            client,
            base_url,
            fetch_batch_size: config.fetch_batch_size.max(1),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_chunk(
        &self,
        namespace: &str,
        ids: &[String],
    ) -> SourceResult<HashMap<String, RawMetadata>> {
        let url = format!("{}/vectors/fetch", self.base_url);
        let mut query: Vec<(&str, &str)> = ids.iter().map(|id| ("ids", id.as_str())).collect();
        query.push(("namespace", namespace));

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let response = check_status(response, false).await?;
        let body: FetchResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse fetch response: {}", e)))?;

        Ok(body
            .vectors
            .into_iter()
            .filter_map(|(id, vector)| vector.metadata.map(|meta| (id, meta)))
            .collect())
    }

    fn transport_error(&self, error: reqwest::Error) -> SourceError {
        if error.is_timeout() {
            SourceError::Timeout {
                duration_ms: self.timeout.as_millis() as u64,
            }
        } else {
            SourceError::Network(error.to_string())
        }
    }
}

#[async_trait]
impl SourceCatalog for PineconeCatalog {
    async fn list_page(
        &self,
        namespace: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> SourceResult<IdPage> {
        let url = format!("{}/vectors/list", self.base_url);
        let limit = limit.to_string();
        let mut query = vec![("namespace", namespace), ("limit", limit.as_str())];
        if let Some(token) = cursor {
            query.push(("paginationToken", token));
        }

        debug!("Listing ids in '{}' (cursor: {:?})", namespace, cursor);
        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let response = check_status(response, cursor.is_some()).await?;
        let body: ListResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse list response: {}", e)))?;

        Ok(IdPage {
            ids: body.vectors.into_iter().map(|v| v.id).collect(),
            next_cursor: body
                .pagination
                .and_then(|p| p.next)
                .filter(|next| !next.is_empty()),
        })
    }

    async fn fetch_metadata(
        &self,
        namespace: &str,
        ids: &[String],
    ) -> SourceResult<HashMap<String, RawMetadata>> {
        let mut metadata = HashMap::with_capacity(ids.len());
        for chunk in ids.chunks(self.fetch_batch_size) {
            metadata.extend(self.fetch_chunk(namespace, chunk).await?);
        }

        if metadata.len() < ids.len() {
            debug!(
                "Fetched metadata for {} of {} ids",
                metadata.len(),
                ids.len()
            );
        }
        Ok(metadata)
    }
}

/// Map a non-success response to a [`SourceError`]
///
/// A 400 that mentions the pagination token while a cursor was sent means
/// the cursor is no longer accepted.
async fn check_status(response: Response, sent_cursor: bool) -> SourceResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    if sent_cursor && status == StatusCode::BAD_REQUEST && mentions_cursor(&message) {
        warn!("Catalog rejected pagination token: {}", message);
        return Err(SourceError::InvalidCursor(message));
    }

    Err(SourceError::Api {
        status: status.as_u16(),
        message,
    })
}

fn mentions_cursor(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("pagination") || lower.contains("token")
}

fn header_value(value: &str) -> SourceResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| SourceError::Network(format!("Invalid header value: {}", e)))
}

fn normalize_host(host: &str) -> String {
    let trimmed = host.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    vectors: Vec<ListedVector>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct ListedVector {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: HashMap<String, FetchedVector>,
}

#[derive(Debug, Deserialize)]
struct FetchedVector {
    #[serde(default)]
    metadata: Option<RawMetadata>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host_adds_scheme() {
        assert_eq!(
            normalize_host("idx-123.svc.pinecone.io/"),
            "https://idx-123.svc.pinecone.io"
        );
        assert_eq!(normalize_host("http://localhost:5080"), "http://localhost:5080");
    }

    #[test]
    fn test_new_requires_api_key() {
        let config = SourceConfig {
            host: "idx.example.io".to_string(),
            ..Default::default()
        };
        assert!(PineconeCatalog::new(&config).is_err());
    }

    #[test]
    fn test_cursor_message_detection() {
        assert!(mentions_cursor(r#"{"code":3,"message":"Invalid pagination token"}"#));
        assert!(!mentions_cursor(r#"{"code":3,"message":"limit must be <= 100"}"#));
    }
}
