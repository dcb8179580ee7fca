//! Retry executor
//!
//! Owns the graph session for the whole run. Each operation is attempted up
//! to `max_attempts` times; a retriable failure discards the session, waits
//! `min(base * 2^(attempt-1), max)` and reconnects before the next attempt.
//! A fatal failure is returned immediately.

use crate::error::RetryFailure;
use propgraph_config::RetryConfig;
use propgraph_core::{
    GraphConnector, GraphCounts, GraphError, GraphResult, GraphSession, PropertyRecord, ResetMode,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay(),
            max_delay: config.max_delay(),
        }
    }

    /// Delay after the `attempt`-th failure (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// A graph operation the executor can retry
#[derive(Debug, Clone, Copy)]
pub enum GraphOp<'r> {
    EnsureSchema,
    Reset(ResetMode),
    Merge(&'r PropertyRecord),
}

impl GraphOp<'_> {
    async fn apply(&self, session: &dyn GraphSession) -> GraphResult<()> {
        match self {
            GraphOp::EnsureSchema => session.ensure_schema().await,
            GraphOp::Reset(mode) => session.reset(*mode).await,
            GraphOp::Merge(record) => session.merge_property(record).await,
        }
    }
}

impl fmt::Display for GraphOp<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphOp::EnsureSchema => f.write_str("ensure schema"),
            GraphOp::Reset(mode) => write!(f, "reset ({})", mode),
            GraphOp::Merge(record) => write!(f, "merge property {}", record.zpid),
        }
    }
}

/// Retry counters for the run summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryStats {
    /// Attempts beyond the first, across all operations
    pub retries: u64,
    /// Sessions opened, including the first
    pub connects: u64,
}

/// Runs graph operations with classified retries on a single owned session
pub struct RetryExecutor {
    connector: Arc<dyn GraphConnector>,
    session: Option<Box<dyn GraphSession>>,
    policy: RetryPolicy,
    operation_timeout: Duration,
    stats: RetryStats,
}

impl RetryExecutor {
    pub fn new(
        connector: Arc<dyn GraphConnector>,
        policy: RetryPolicy,
        operation_timeout: Duration,
    ) -> Self {
        Self {
            connector,
            session: None,
            policy,
            operation_timeout,
            stats: RetryStats::default(),
        }
    }

    pub fn stats(&self) -> RetryStats {
        self.stats
    }

    /// Run `op`, retrying retriable failures on a fresh session
    pub async fn execute(&mut self, op: GraphOp<'_>) -> Result<(), RetryFailure> {
        let max_attempts = self.policy.max_attempts;

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                self.stats.retries += 1;
            }

            let error = match self.attempt(&op).await {
                Ok(()) => {
                    if attempt > 1 {
                        info!("{} succeeded on attempt {}", op, attempt);
                    }
                    return Ok(());
                }
                Err(error) => error,
            };

            if !error.is_retryable() {
                warn!("{} failed with a non-retryable error: {}", op, error);
                return Err(RetryFailure {
                    operation: op.to_string(),
                    attempts: attempt,
                    exhausted: false,
                    source: error,
                });
            }

            self.discard_session().await;

            if attempt == max_attempts {
                warn!("{} failed on final attempt {}: {}", op, attempt, error);
                return Err(RetryFailure {
                    operation: op.to_string(),
                    attempts: attempt,
                    exhausted: true,
                    source: error,
                });
            }

            let delay = self.policy.delay_for(attempt);
            warn!(
                "{} failed on attempt {}/{}: {}; retrying in {:?}",
                op, attempt, max_attempts, error, delay
            );
            tokio::time::sleep(delay).await;
        }

        // max_attempts is at least 1, so the loop always returns
        Err(RetryFailure {
            operation: op.to_string(),
            attempts: 0,
            exhausted: true,
            source: GraphError::Internal("no attempts were made".to_string()),
        })
    }

    /// Node and edge counts on the current session, without retries
    pub async fn counts(&mut self) -> GraphResult<GraphCounts> {
        let session = self.session().await?;
        session.counts().await
    }

    /// Close the session if one is open
    pub async fn close(&mut self) {
        if let Some(session) = self.session.take() {
            match session.close().await {
                Ok(()) => debug!("Closed {} session", self.connector.name()),
                Err(e) => warn!("Failed to close {} session: {}", self.connector.name(), e),
            }
        }
    }

    async fn attempt(&mut self, op: &GraphOp<'_>) -> GraphResult<()> {
        let timeout = self.operation_timeout;
        let session = self.session().await?;
        match tokio::time::timeout(timeout, op.apply(session)).await {
            Ok(result) => result,
            Err(_) => Err(GraphError::Timeout {
                duration_ms: timeout.as_millis() as u64,
            }),
        }
    }

    async fn session(&mut self) -> GraphResult<&dyn GraphSession> {
        if self.session.is_none() {
            let connect = self.connector.connect();
            let session = match tokio::time::timeout(self.operation_timeout, connect).await {
                Ok(session) => session?,
                Err(_) => {
                    return Err(GraphError::Timeout {
                        duration_ms: self.operation_timeout.as_millis() as u64,
                    })
                }
            };
            self.stats.connects += 1;
            debug!("Opened {} session #{}", self.connector.name(), self.stats.connects);
            self.session = Some(session);
        }

        self.session
            .as_deref()
            .ok_or_else(|| GraphError::Internal("session unavailable".to_string()))
    }

    async fn discard_session(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(e) = session.close().await {
                debug!("Ignoring close failure on discarded session: {}", e);
            }
        }
    }
}
