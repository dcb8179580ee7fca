//! Paginated source reader
//!
//! Lists id pages from the catalog and fetches their metadata, each call
//! bounded by the operation timeout. When a saved cursor is rejected the
//! reader can rebuild the position by re-listing from the start and skipping
//! the pages the checkpoint says were already processed. That recovery is
//! approximate: records added or removed upstream since the checkpoint shift
//! the skip boundary, and skipped (unwritable) records are not counted in
//! `processed`, so some records may be written twice.

use propgraph_config::{MAX_PAGE_SIZE, MIN_PAGE_SIZE};
use propgraph_core::{IdPage, RawMetadata, SourceCatalog, SourceError, SourceResult};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Checkpoint figures used to rebuild a rejected cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumePoint {
    pub processed: u64,
    pub page_size: usize,
}

impl ResumePoint {
    /// Whole pages covered by `processed`
    pub fn pages_to_skip(&self) -> u64 {
        self.processed / self.page_size.max(MIN_PAGE_SIZE) as u64
    }
}

pub struct SourceReader {
    catalog: Arc<dyn SourceCatalog>,
    namespace: String,
    timeout: Duration,
    resume: Option<ResumePoint>,
    fallback_used: bool,
}

impl SourceReader {
    pub fn new(
        catalog: Arc<dyn SourceCatalog>,
        namespace: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            namespace: namespace.into(),
            timeout,
            resume: None,
            fallback_used: false,
        }
    }

    /// Replace the figures used if the next cursor is rejected
    pub fn set_resume(&mut self, resume: Option<ResumePoint>) {
        self.resume = resume;
    }

    /// Whether a rejected cursor was recovered by re-listing
    pub fn fallback_used(&self) -> bool {
        self.fallback_used
    }

    /// List up to `limit` ids starting at `cursor`
    pub async fn list_page(&mut self, cursor: Option<&str>, limit: usize) -> SourceResult<IdPage> {
        let limit = clamp_limit(limit);

        match self.list_once(cursor, limit).await {
            Err(e) if e.is_invalid_cursor() && cursor.is_some() => match self.resume {
                Some(resume) => {
                    warn!(
                        "Cursor rejected by the catalog ({}); re-listing from the start and \
                         skipping {} page(s) of {}",
                        e,
                        resume.pages_to_skip(),
                        resume.page_size
                    );
                    let page = self.relist(resume, limit).await?;
                    self.fallback_used = true;
                    Ok(page)
                }
                None => Err(e),
            },
            other => other,
        }
    }

    /// Metadata for `ids`; ids the catalog has nothing for are absent
    pub async fn fetch_metadata(
        &self,
        ids: &[String],
    ) -> SourceResult<HashMap<String, RawMetadata>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.bounded(self.catalog.fetch_metadata(&self.namespace, ids))
            .await
    }

    async fn list_once(&self, cursor: Option<&str>, limit: usize) -> SourceResult<IdPage> {
        self.bounded(self.catalog.list_page(&self.namespace, cursor, limit))
            .await
    }

    async fn relist(&self, resume: ResumePoint, limit: usize) -> SourceResult<IdPage> {
        let skip_size = clamp_limit(resume.page_size);
        let mut cursor: Option<String> = None;

        for skipped in 0..resume.pages_to_skip() {
            let page = self.list_once(cursor.as_deref(), skip_size).await?;
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => {
                    info!(
                        "Source ended after {} of {} skipped page(s); nothing left to resume",
                        skipped + 1,
                        resume.pages_to_skip()
                    );
                    return Ok(IdPage::default());
                }
            }
        }

        debug!("Resuming listing at {:?}", cursor);
        self.list_once(cursor.as_deref(), limit).await
    }

    async fn bounded<T>(&self, call: impl Future<Output = SourceResult<T>>) -> SourceResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout {
                duration_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

fn clamp_limit(limit: usize) -> usize {
    limit.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use propgraph_core::test_support::mocks::{ListCall, MockSourceCatalog};

    fn reader(catalog: &MockSourceCatalog) -> SourceReader {
        SourceReader::new(Arc::new(catalog.clone()), "ns", Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_limit_is_clamped() {
        let catalog = MockSourceCatalog::with_properties(3);
        let mut reader = reader(&catalog);

        reader.list_page(None, 0).await.unwrap();
        reader.list_page(None, 50_000).await.unwrap();

        let limits: Vec<usize> = catalog.list_calls().iter().map(|c| c.limit).collect();
        assert_eq!(limits, vec![1, 1000]);
    }

    #[tokio::test]
    async fn test_rejected_cursor_skips_processed_pages() {
        let catalog = MockSourceCatalog::with_properties(10);
        catalog.invalidate_cursor("stale");
        let mut reader = reader(&catalog);
        reader.set_resume(Some(ResumePoint {
            processed: 4,
            page_size: 2,
        }));

        let page = reader.list_page(Some("stale"), 3).await.unwrap();

        assert_eq!(page.ids, vec!["prop-5", "prop-6", "prop-7"]);
        assert!(reader.fallback_used());
        assert_eq!(
            catalog.list_calls(),
            vec![
                ListCall { cursor: Some("stale".to_string()), limit: 3 },
                ListCall { cursor: None, limit: 2 },
                ListCall { cursor: Some("cursor-2".to_string()), limit: 2 },
                ListCall { cursor: Some("cursor-4".to_string()), limit: 3 },
            ]
        );
    }

    #[tokio::test]
    async fn test_rejected_cursor_without_resume_data_propagates() {
        let catalog = MockSourceCatalog::with_properties(4);
        catalog.invalidate_cursor("stale");
        let mut reader = reader(&catalog);

        let err = reader.list_page(Some("stale"), 2).await.unwrap_err();
        assert!(err.is_invalid_cursor());
        assert!(!reader.fallback_used());
    }

    #[tokio::test]
    async fn test_skipping_past_the_end_yields_empty_page() {
        let catalog = MockSourceCatalog::with_properties(3);
        catalog.invalidate_cursor("stale");
        let mut reader = reader(&catalog);
        reader.set_resume(Some(ResumePoint {
            processed: 6,
            page_size: 2,
        }));

        let page = reader.list_page(Some("stale"), 2).await.unwrap();
        assert!(page.is_end());
    }

    #[tokio::test]
    async fn test_other_errors_do_not_trigger_fallback() {
        let catalog = MockSourceCatalog::with_properties(4);
        catalog.fail_next_list(SourceError::Network("reset".to_string()));
        let mut reader = reader(&catalog);
        reader.set_resume(Some(ResumePoint {
            processed: 2,
            page_size: 2,
        }));

        let err = reader.list_page(Some("cursor-2"), 2).await.unwrap_err();
        assert!(matches!(err, SourceError::Network(_)));
        assert_eq!(catalog.list_calls().len(), 1);
    }
}
