//! Backend construction from configuration
//!
//! Commands never build catalogs, graph connectors or checkpoint stores
//! themselves; they ask for them here so every command resolves the
//! configuration the same way.

use anyhow::{Context, Result};
use propgraph_catalog::PineconeCatalog;
use propgraph_config::{CheckpointBackend, GraphBackend, PropgraphConfig, SourceConfig};
use propgraph_core::{CheckpointStore, FileCheckpointStore, GraphConnector, SourceCatalog};
use propgraph_neo4j::Neo4jGraphConnector;
use propgraph_surrealdb::SurrealGraphConnector;
use std::sync::Arc;
use tracing::debug;

/// Graph connector and checkpoint store for one invocation
pub struct Backends {
    pub graph: Arc<dyn GraphConnector>,
    pub checkpoints: Arc<dyn CheckpointStore>,
}

/// HTTP catalog client
pub fn catalog(config: &SourceConfig) -> Result<Arc<dyn SourceCatalog>> {
    let catalog = PineconeCatalog::new(config).context("Failed to create catalog client")?;
    debug!("Catalog client for {}", catalog.base_url());
    Ok(Arc::new(catalog))
}

/// Graph connector and checkpoint store
///
/// SurrealDB is opened at most once even when it serves as both graph and
/// checkpoint store, since the RocksDB engine holds an exclusive lock.
pub async fn backends(config: &PropgraphConfig) -> Result<Backends> {
    let needs_surreal = config.graph.backend == GraphBackend::Surrealdb
        || config.checkpoint.backend == CheckpointBackend::Surrealdb;
    let surreal = if needs_surreal {
        Some(open_surreal(config).await?)
    } else {
        None
    };

    let graph: Arc<dyn GraphConnector> = match (config.graph.backend, &surreal) {
        (GraphBackend::Surrealdb, Some(surreal)) => Arc::new(surreal.clone()),
        (GraphBackend::Surrealdb, None) => Arc::new(open_surreal(config).await?),
        (GraphBackend::Neo4j, _) => {
            Arc::new(Neo4jGraphConnector::new(config.graph.neo4j.clone()))
        }
    };

    let checkpoints = checkpoint_store(config, surreal.as_ref()).await?;
    Ok(Backends { graph, checkpoints })
}

/// Checkpoint store alone, for commands that never touch the graph
pub async fn checkpoint_store(
    config: &PropgraphConfig,
    surreal: Option<&SurrealGraphConnector>,
) -> Result<Arc<dyn CheckpointStore>> {
    let store: Arc<dyn CheckpointStore> = match config.checkpoint.backend {
        CheckpointBackend::File => Arc::new(FileCheckpointStore::new(&config.checkpoint.path)),
        CheckpointBackend::Surrealdb => match surreal {
            Some(surreal) => Arc::new(surreal.checkpoint_store()),
            None => Arc::new(open_surreal(config).await?.checkpoint_store()),
        },
    };
    debug!("Checkpoints stored in {}", store.describe());
    Ok(store)
}

async fn open_surreal(config: &PropgraphConfig) -> Result<SurrealGraphConnector> {
    let surreal = &config.graph.surrealdb;
    SurrealGraphConnector::new(surreal.clone())
        .await
        .with_context(|| format!("Failed to open SurrealDB at {}", surreal.path))
}
