//! Checkpoint persistence
//!
//! A [`Checkpoint`] records how far an ingest run got through one catalog
//! namespace. It is written after every fully processed page and read once at
//! startup to resume.
//!
//! # Stored format
//!
//! ```json
//! {
//!   "namespace": "properties",
//!   "nextToken": "eyJza2lwX3Bhc3Q...",
//!   "processed": 1200,
//!   "pageSize": 100,
//!   "timestamp": "2024-05-01T12:00:00Z"
//! }
//! ```
//!
//! `nextToken` is `null` once the source is exhausted.

use crate::error::CheckpointResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Durable progress record for one namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub namespace: String,
    /// Cursor of the next unprocessed page
    pub next_token: Option<String>,
    /// Records written as of the last saved page boundary
    pub processed: u64,
    /// Page size in effect when the checkpoint was saved
    pub page_size: usize,
    pub timestamp: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(
        namespace: impl Into<String>,
        next_token: Option<String>,
        processed: u64,
        page_size: usize,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            next_token,
            processed,
            page_size,
            timestamp: Utc::now(),
        }
    }

    /// The run that saved this checkpoint reached the end of the source
    pub fn is_complete(&self) -> bool {
        self.next_token.is_none()
    }
}

/// Storage for checkpoints
///
/// All methods take `&self`; implementations synchronize internally.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load the checkpoint for `namespace`, if one was saved
    async fn load(&self, namespace: &str) -> CheckpointResult<Option<Checkpoint>>;

    /// Replace the checkpoint for `checkpoint.namespace`
    async fn save(&self, checkpoint: &Checkpoint) -> CheckpointResult<()>;

    /// Storage location for logs
    fn describe(&self) -> String;
}

/// In-memory checkpoint store for tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct InMemoryCheckpointStore {
    checkpoints: Arc<RwLock<HashMap<String, Checkpoint>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `checkpoint`
    pub fn with_checkpoint(checkpoint: Checkpoint) -> Self {
        let mut map = HashMap::new();
        map.insert(checkpoint.namespace.clone(), checkpoint);
        Self {
            checkpoints: Arc::new(RwLock::new(map)),
        }
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn load(&self, namespace: &str) -> CheckpointResult<Option<Checkpoint>> {
        Ok(self.checkpoints.read().await.get(namespace).cloned())
    }

    async fn save(&self, checkpoint: &Checkpoint) -> CheckpointResult<()> {
        self.checkpoints
            .write()
            .await
            .insert(checkpoint.namespace.clone(), checkpoint.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Single JSON file holding the most recent checkpoint
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so a crash mid-write leaves the previous checkpoint readable.
/// Loading a file saved for another namespace yields `None`.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "checkpoint".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self, namespace: &str) -> CheckpointResult<Option<Checkpoint>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let checkpoint: Checkpoint = serde_json::from_str(&contents)?;
        if checkpoint.namespace != namespace {
            debug!(
                "Checkpoint at {} belongs to namespace '{}', not '{}'",
                self.path.display(),
                checkpoint.namespace,
                namespace
            );
            return Ok(None);
        }
        Ok(Some(checkpoint))
    }

    async fn save(&self, checkpoint: &Checkpoint) -> CheckpointResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(checkpoint)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
