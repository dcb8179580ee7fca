//! Page writer
//!
//! Normalizes every id of a page and merges the resulting records one at a
//! time through the retry executor. Skipped ids are tallied, never written.

use crate::error::{PipelineError, PipelineResult};
use crate::retry::{GraphOp, RetryExecutor};
use propgraph_core::{normalize, NormalizeIssue, Normalized, RawMetadata};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// What happened to one page's records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageOutcome {
    pub written: u64,
    /// Skip counts by [`SkipReason::label`](propgraph_core::SkipReason::label)
    pub skipped: BTreeMap<&'static str, u64>,
    /// Records written with their address fields nulled
    pub malformed: u64,
}

impl PageOutcome {
    pub fn skipped_total(&self) -> u64 {
        self.skipped.values().sum()
    }
}

pub struct PageWriter<'e> {
    executor: &'e mut RetryExecutor,
}

impl<'e> PageWriter<'e> {
    pub fn new(executor: &'e mut RetryExecutor) -> Self {
        Self { executor }
    }

    /// Write `ids` in listing order
    ///
    /// Stops at the first record that cannot be written; records before it
    /// stay written, which is safe because merges are idempotent.
    pub async fn write_page(
        &mut self,
        page: u64,
        ids: &[String],
        metadata: &HashMap<String, RawMetadata>,
    ) -> PipelineResult<PageOutcome> {
        let mut outcome = PageOutcome::default();

        for id in ids {
            match normalize(metadata.get(id)) {
                Normalized::Skipped { reason } => {
                    warn!("Skipping {} on page {}: {}", id, page, reason);
                    *outcome.skipped.entry(reason.label()).or_insert(0) += 1;
                }
                Normalized::Record { record, issues } => {
                    for issue in &issues {
                        match issue {
                            NormalizeIssue::MalformedAddress(detail) => {
                                debug!(
                                    "Property {} has a malformed address: {}",
                                    record.zpid, detail
                                );
                                outcome.malformed += 1;
                            }
                        }
                    }

                    self.executor
                        .execute(GraphOp::Merge(&record))
                        .await
                        .map_err(|source| PipelineError::Write {
                            page,
                            zpid: record.zpid,
                            source,
                        })?;

                    debug!("Merged property {} ({})", record.zpid, id);
                    outcome.written += 1;
                }
            }
        }

        Ok(outcome)
    }
}
