//! Checkpoints stored in SurrealDB
//!
//! Each namespace maps to one `checkpoint:<namespace>` record, replaced on
//! every save.

use crate::queries::CHECKPOINT_TABLE;
use async_trait::async_trait;
use propgraph_core::{Checkpoint, CheckpointError, CheckpointResult, CheckpointStore};
use serde::{Deserialize, Serialize};
use surrealdb::engine::local::Db;
use surrealdb::Surreal;
use tracing::trace;

/// Stored form of a checkpoint; the timestamp is kept as RFC 3339 text
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckpointRecord {
    namespace: String,
    next_token: Option<String>,
    processed: u64,
    page_size: u64,
    timestamp: String,
}

impl CheckpointRecord {
    fn from_checkpoint(checkpoint: &Checkpoint) -> Self {
        Self {
            namespace: checkpoint.namespace.clone(),
            next_token: checkpoint.next_token.clone(),
            processed: checkpoint.processed,
            page_size: checkpoint.page_size as u64,
            timestamp: checkpoint.timestamp.to_rfc3339(),
        }
    }

    fn into_checkpoint(self) -> CheckpointResult<Checkpoint> {
        let timestamp = self
            .timestamp
            .parse()
            .map_err(|e| CheckpointError::Storage(format!("Invalid checkpoint timestamp: {}", e)))?;
        Ok(Checkpoint {
            namespace: self.namespace,
            next_token: self.next_token,
            processed: self.processed,
            page_size: self.page_size as usize,
            timestamp,
        })
    }
}

/// SurrealDB-backed checkpoint store
#[derive(Clone)]
pub struct SurrealCheckpointStore {
    db: Surreal<Db>,
}

impl SurrealCheckpointStore {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }
}

fn storage_error(context: &str, error: surrealdb::Error) -> CheckpointError {
    CheckpointError::Storage(format!("{}: {}", context, error))
}

#[async_trait]
impl CheckpointStore for SurrealCheckpointStore {
    async fn load(&self, namespace: &str) -> CheckpointResult<Option<Checkpoint>> {
        trace!("Loading checkpoint for namespace '{}'", namespace);

        let mut response = self
            .db
            .query(
                "SELECT namespace, nextToken, processed, pageSize, timestamp \
                 FROM type::thing($table, $namespace)",
            )
            .bind(("table", CHECKPOINT_TABLE))
            .bind(("namespace", namespace.to_string()))
            .await
            .map_err(|e| storage_error("Failed to query checkpoint", e))?
            .check()
            .map_err(|e| storage_error("Checkpoint query returned error", e))?;

        let record: Option<CheckpointRecord> = response
            .take(0)
            .map_err(|e| storage_error("Failed to read checkpoint record", e))?;

        record.map(CheckpointRecord::into_checkpoint).transpose()
    }

    async fn save(&self, checkpoint: &Checkpoint) -> CheckpointResult<()> {
        let record = CheckpointRecord::from_checkpoint(checkpoint);
        trace!(
            "Saving checkpoint for '{}' at {} processed",
            record.namespace,
            record.processed
        );

        self.db
            .query("UPSERT type::thing($table, $namespace) CONTENT $record")
            .bind(("table", CHECKPOINT_TABLE))
            .bind(("namespace", record.namespace.clone()))
            .bind(("record", record))
            .await
            .map_err(|e| storage_error("Failed to save checkpoint", e))?
            .check()
            .map_err(|e| storage_error("Checkpoint save returned error", e))?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("surrealdb:{}", CHECKPOINT_TABLE)
    }
}
