//! Run controller
//!
//! Drives one ingest run through its states:
//!
//! ```text
//! Init -> Bootstrapping -> (Resetting) -> Resuming -> Paging -> Completed
//!                                                           \-> Aborted
//!                                                           \-> Interrupted
//! ```
//!
//! ## Phases
//!
//! 1. **Bootstrap**: ensure constraints and indexes exist
//! 2. **Reset**: optional destructive reset, only when configured
//! 3. **Resume**: choose the starting cursor (explicit cursor, checkpoint, or
//!    the beginning)
//! 4. **Page**: list ids, fetch metadata, normalize and write each record,
//!    then save a checkpoint; repeat until the source or the limit runs out
//!
//! A [`RunSession`] owns every resource for the run and releases the graph
//! session on all exit paths. Dependencies are injected as trait objects so
//! the same controller runs against real backends and test mocks.

use crate::checkpoint::CheckpointManager;
use crate::error::{PipelineError, PipelineResult};
use crate::retry::{GraphOp, RetryExecutor, RetryPolicy};
use crate::source::{ResumePoint, SourceReader};
use crate::writer::PageWriter;
use propgraph_config::{IngestConfig, RecordLimit, ResetMode};
use propgraph_core::{CheckpointStore, GraphConnector, SourceCatalog};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Exit code for a run stopped by a shutdown signal
pub const EXIT_INTERRUPTED: i32 = 130;

/// Lifecycle state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Init,
    Bootstrapping,
    Resetting,
    Resuming,
    Paging,
    Completed,
    Aborted,
    Interrupted,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted | Self::Interrupted)
    }

    /// Process exit code for a terminal state
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed => 0,
            Self::Interrupted => EXIT_INTERRUPTED,
            _ => 1,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Bootstrapping => "bootstrapping",
            Self::Resetting => "resetting",
            Self::Resuming => "resuming",
            Self::Paging => "paging",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
            Self::Interrupted => "interrupted",
        };
        f.write_str(name)
    }
}

/// Run behavior taken from the `[ingest]` configuration
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub namespace: String,
    pub page_size: usize,
    pub limit: RecordLimit,
    pub resume: bool,
    pub reset: ResetMode,
    pub start_cursor: Option<String>,
    pub operation_timeout: Duration,
}

impl RunSettings {
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            namespace: config.namespace.clone(),
            page_size: config.page_size,
            limit: config.limit,
            resume: config.resume,
            reset: config.reset,
            start_cursor: config.start_cursor.clone(),
            operation_timeout: Duration::from_secs(config.operation_timeout_secs),
        }
    }
}

/// Final report of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub namespace: String,
    pub state: RunState,
    /// Pages fully processed in this run
    pub pages: u64,
    /// Records written in this run
    pub written: u64,
    /// Cumulative processed count, including any resumed progress
    pub processed: u64,
    pub skipped: BTreeMap<String, u64>,
    /// Records written with a malformed address
    pub malformed: u64,
    pub retries: u64,
    pub reconnects: u64,
    pub fallback_used: bool,
    pub checkpoint_failures: u64,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl RunSummary {
    fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            state: RunState::Init,
            pages: 0,
            written: 0,
            processed: 0,
            skipped: BTreeMap::new(),
            malformed: 0,
            retries: 0,
            reconnects: 0,
            fallback_used: false,
            checkpoint_failures: 0,
            duration_ms: 0,
            error: None,
        }
    }

    pub fn skipped_total(&self) -> u64 {
        self.skipped.values().sum()
    }

    pub fn exit_code(&self) -> i32 {
        self.state.exit_code()
    }
}

/// Where paging starts
struct StartPosition {
    cursor: Option<String>,
    processed: u64,
    /// Whether `processed` corresponds to a position in the listing
    tracks_offset: bool,
}

/// All state for one ingest run
pub struct RunSession {
    settings: RunSettings,
    reader: SourceReader,
    executor: RetryExecutor,
    checkpoints: CheckpointManager,
    cancel: CancellationToken,
    state: RunState,
    summary: RunSummary,
}

impl RunSession {
    pub fn new(
        settings: RunSettings,
        catalog: Arc<dyn SourceCatalog>,
        connector: Arc<dyn GraphConnector>,
        checkpoint_store: Arc<dyn CheckpointStore>,
        policy: RetryPolicy,
        cancel: CancellationToken,
    ) -> Self {
        let reader = SourceReader::new(
            catalog,
            settings.namespace.clone(),
            settings.operation_timeout,
        );
        let executor = RetryExecutor::new(connector, policy, settings.operation_timeout);
        let checkpoints = CheckpointManager::new(checkpoint_store, settings.namespace.clone());
        let summary = RunSummary::new(&settings.namespace);

        Self {
            settings,
            reader,
            executor,
            checkpoints,
            cancel,
            state: RunState::Init,
            summary,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run to a terminal state
    ///
    /// Never returns an error: failures end in [`RunState::Aborted`] with the
    /// message in [`RunSummary::error`]. The last saved checkpoint is left as
    /// it was.
    pub async fn run(mut self) -> RunSummary {
        let start = Instant::now();
        info!(
            "Starting ingest: namespace='{}', page_size={}, limit={}, resume={}, reset={}",
            self.settings.namespace,
            self.settings.page_size,
            self.settings.limit,
            self.settings.resume,
            self.settings.reset
        );

        let result = self.drive().await;
        self.executor.close().await;

        let state = match result {
            Ok(state) => state,
            Err(e) => {
                error!("Ingest aborted: {}", e);
                self.summary.error = Some(e.to_string());
                RunState::Aborted
            }
        };
        self.enter(state);

        let stats = self.executor.stats();
        self.summary.state = state;
        self.summary.retries = stats.retries;
        self.summary.reconnects = stats.connects.saturating_sub(1);
        self.summary.fallback_used = self.reader.fallback_used();
        self.summary.checkpoint_failures = self.checkpoints.save_failures();
        self.summary.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Ingest {}: {} written, {} skipped, {} processed in total over {} page(s) ({}ms)",
            state,
            self.summary.written,
            self.summary.skipped_total(),
            self.summary.processed,
            self.summary.pages,
            self.summary.duration_ms
        );
        self.summary
    }

    fn enter(&mut self, next: RunState) {
        if self.state != next {
            debug!("Run state: {} -> {}", self.state, next);
            self.state = next;
        }
    }

    async fn drive(&mut self) -> PipelineResult<RunState> {
        self.enter(RunState::Bootstrapping);
        self.executor
            .execute(GraphOp::EnsureSchema)
            .await
            .map_err(PipelineError::Bootstrap)?;
        info!("Graph schema ready");

        if self.settings.reset.is_destructive() {
            self.enter(RunState::Resetting);
            self.executor
                .execute(GraphOp::Reset(self.settings.reset))
                .await
                .map_err(PipelineError::Reset)?;
            info!("Graph reset ({}) complete", self.settings.reset);
        }

        self.enter(RunState::Resuming);
        let start = self.start_position().await;

        self.enter(RunState::Paging);
        self.page_loop(start).await
    }

    async fn start_position(&mut self) -> StartPosition {
        if let Some(cursor) = self.settings.start_cursor.clone() {
            info!("Starting at explicit cursor {}", cursor);
            return StartPosition {
                cursor: Some(cursor),
                processed: 0,
                tracks_offset: false,
            };
        }

        let fresh = StartPosition {
            cursor: None,
            processed: 0,
            tracks_offset: true,
        };

        if self.settings.reset.is_destructive() {
            info!("Reset requested; ignoring any stored checkpoint");
            return fresh;
        }
        if !self.settings.resume {
            info!("Resume disabled; starting from the beginning");
            return fresh;
        }

        match self.checkpoints.load().await {
            None => {
                info!(
                    "No checkpoint for '{}'; starting from the beginning",
                    self.settings.namespace
                );
                fresh
            }
            Some(checkpoint) if checkpoint.is_complete() => {
                info!(
                    "Previous run completed with {} processed; starting a fresh pass",
                    checkpoint.processed
                );
                fresh
            }
            Some(checkpoint) => {
                info!(
                    "Resuming after {} processed records (page size {})",
                    checkpoint.processed, checkpoint.page_size
                );
                self.reader.set_resume(Some(ResumePoint {
                    processed: checkpoint.processed,
                    page_size: checkpoint.page_size,
                }));
                StartPosition {
                    cursor: checkpoint.next_token,
                    processed: checkpoint.processed,
                    tracks_offset: true,
                }
            }
        }
    }

    async fn page_loop(&mut self, start: StartPosition) -> PipelineResult<RunState> {
        let page_size = self.settings.page_size;
        let mut cursor = start.cursor;
        let mut processed = start.processed;
        self.summary.processed = processed;

        loop {
            if self.cancel.is_cancelled() {
                info!("Shutdown requested; stopping after {} page(s)", self.summary.pages);
                return Ok(RunState::Interrupted);
            }

            let request = match self.settings.limit.remaining(processed) {
                Some(0) => {
                    info!("Record limit {} reached", self.settings.limit);
                    return Ok(RunState::Completed);
                }
                Some(remaining) => {
                    page_size.min(usize::try_from(remaining).unwrap_or(usize::MAX))
                }
                None => page_size,
            };

            let page_number = self.summary.pages + 1;
            let page = self
                .reader
                .list_page(cursor.as_deref(), request)
                .await
                .map_err(|source| PipelineError::Source {
                    page: page_number,
                    source,
                })?;

            if page.ids.is_empty() {
                if cursor.is_some() && page.next_cursor.is_none() {
                    self.checkpoints.save(None, processed, page_size).await;
                }
                info!("Source exhausted after {} processed", processed);
                return Ok(RunState::Completed);
            }

            let metadata = self
                .reader
                .fetch_metadata(&page.ids)
                .await
                .map_err(|source| PipelineError::Source {
                    page: page_number,
                    source,
                })?;

            let outcome = PageWriter::new(&mut self.executor)
                .write_page(page_number, &page.ids, &metadata)
                .await?;

            processed += outcome.written;
            self.summary.pages = page_number;
            self.summary.processed = processed;
            self.summary.written += outcome.written;
            self.summary.malformed += outcome.malformed;
            for (label, count) in &outcome.skipped {
                *self.summary.skipped.entry(label.to_string()).or_insert(0) += count;
            }

            self.checkpoints
                .save(page.next_cursor.clone(), processed, page_size)
                .await;
            if start.tracks_offset {
                self.reader.set_resume(Some(ResumePoint {
                    processed,
                    page_size,
                }));
            }

            info!(
                "Page {}: {} ids, {} written, {} skipped ({} processed)",
                page_number,
                page.ids.len(),
                outcome.written,
                outcome.skipped_total(),
                processed
            );

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => {
                    info!("Reached the last page");
                    return Ok(RunState::Completed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(RunState::Completed.exit_code(), 0);
        assert_eq!(RunState::Aborted.exit_code(), 1);
        assert_eq!(RunState::Interrupted.exit_code(), 130);
        assert!(!RunState::Paging.is_terminal());
        assert!(RunState::Interrupted.is_terminal());
    }

    #[test]
    fn test_settings_from_config() {
        let config = IngestConfig {
            limit: RecordLimit::Max(10),
            start_cursor: Some("abc".to_string()),
            ..Default::default()
        };
        let settings = RunSettings::from_config(&config);

        assert_eq!(settings.namespace, "properties");
        assert_eq!(settings.page_size, 100);
        assert_eq!(settings.limit, RecordLimit::Max(10));
        assert_eq!(settings.start_cursor.as_deref(), Some("abc"));
        assert_eq!(settings.operation_timeout, Duration::from_secs(30));
    }
}
