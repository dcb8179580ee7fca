//! Ingestion Pipeline
//!
//! Copies property records from a paginated source catalog into a property
//! graph, one page at a time, with a checkpoint after every page so an
//! interrupted run can pick up where it stopped.
//!
//! ## Components
//!
//! - [`SourceReader`]: pages ids and metadata out of the catalog, with cursor
//!   recovery by re-listing
//! - [`PageWriter`]: normalizes records and merges them into the graph
//! - [`RetryExecutor`]: owns the graph session; retries retriable failures
//!   with bounded exponential backoff on a fresh session
//! - [`CheckpointManager`]: best-effort progress records
//! - [`RunSession`]: the state machine tying them together
//!
//! Backends are injected, never constructed here:
//!
//! ```rust,ignore
//! use propgraph_pipeline::{RetryPolicy, RunSession, RunSettings};
//!
//! let session = RunSession::new(
//!     RunSettings::from_config(&config.ingest),
//!     catalog,
//!     connector,
//!     checkpoint_store,
//!     RetryPolicy::from_config(&config.retry),
//!     cancel.clone(),
//! );
//! let summary = session.run().await;
//! std::process::exit(summary.exit_code());
//! ```

pub mod checkpoint;
pub mod controller;
pub mod error;
pub mod retry;
pub mod source;
pub mod writer;

pub use checkpoint::CheckpointManager;
pub use controller::{RunSession, RunSettings, RunState, RunSummary, EXIT_INTERRUPTED};
pub use error::{PipelineError, PipelineResult, RetryFailure};
pub use retry::{GraphOp, RetryExecutor, RetryPolicy, RetryStats};
pub use source::{ResumePoint, SourceReader};
pub use writer::{PageOutcome, PageWriter};
