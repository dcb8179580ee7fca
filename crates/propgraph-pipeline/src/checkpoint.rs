//! Checkpoint manager
//!
//! Wraps a [`CheckpointStore`] for one namespace. Loading and saving never
//! fail the run: problems are logged and the run carries on as if no
//! checkpoint existed (load) or as if the save had been skipped (save).

use propgraph_core::{Checkpoint, CheckpointStore};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct CheckpointManager {
    store: Arc<dyn CheckpointStore>,
    namespace: String,
    save_failures: u64,
}

impl CheckpointManager {
    pub fn new(store: Arc<dyn CheckpointStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            save_failures: 0,
        }
    }

    /// Stored checkpoint for this namespace, if usable
    pub async fn load(&self) -> Option<Checkpoint> {
        match self.store.load(&self.namespace).await {
            Ok(Some(checkpoint)) if checkpoint.namespace == self.namespace => {
                debug!(
                    "Loaded checkpoint from {}: processed={}, next={:?}",
                    self.store.describe(),
                    checkpoint.processed,
                    checkpoint.next_token
                );
                Some(checkpoint)
            }
            Ok(Some(checkpoint)) => {
                warn!(
                    "Ignoring checkpoint for namespace '{}' (running '{}')",
                    checkpoint.namespace, self.namespace
                );
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!(
                    "Could not read checkpoint from {}: {}; starting without it",
                    self.store.describe(),
                    e
                );
                None
            }
        }
    }

    /// Record progress at a page boundary; returns whether the save stuck
    pub async fn save(
        &mut self,
        next_token: Option<String>,
        processed: u64,
        page_size: usize,
    ) -> bool {
        let checkpoint = Checkpoint::new(self.namespace.clone(), next_token, processed, page_size);
        match self.store.save(&checkpoint).await {
            Ok(()) => {
                debug!(
                    "Checkpoint saved: processed={}, next={:?}",
                    checkpoint.processed, checkpoint.next_token
                );
                true
            }
            Err(e) => {
                self.save_failures += 1;
                warn!(
                    "Failed to save checkpoint to {} (processed={}): {}",
                    self.store.describe(),
                    processed,
                    e
                );
                false
            }
        }
    }

    pub fn save_failures(&self) -> u64 {
        self.save_failures
    }
}
