//! Graph connector and session over an embedded SurrealDB database

use crate::error::classify_error;
use crate::queries::{self, CHECKPOINT_TABLE, MODEL_TABLES};
use crate::SurrealCheckpointStore;
use async_trait::async_trait;
use propgraph_config::SurrealGraphConfig;
use propgraph_core::{
    GraphConnector, GraphCounts, GraphError, GraphResult, GraphSession, PropertyRecord, ResetMode,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use surrealdb::engine::local::{Db, Mem};
use surrealdb::Surreal;
use tracing::{debug, info};

/// Opens sessions on one embedded database
///
/// The database handle is opened once; every session shares it. Cloning is
/// cheap and never reopens the storage engine.
#[derive(Clone)]
pub struct SurrealGraphConnector {
    inner: Arc<ConnectorInner>,
}

struct ConnectorInner {
    db: Surreal<Db>,
    config: SurrealGraphConfig,
}

impl std::fmt::Debug for SurrealGraphConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurrealGraphConnector")
            .field("config", &self.inner.config)
            .finish()
    }
}

impl SurrealGraphConnector {
    /// Open the database described by `config`
    pub async fn new(config: SurrealGraphConfig) -> GraphResult<Self> {
        let db = if config.path.is_empty() || config.path == ":memory:" {
            Surreal::new::<Mem>(()).await.map_err(|e| {
                GraphError::Connection(format!("Failed to create in-memory database: {}", e))
            })?
        } else {
            Self::open_file(&config.path).await?
        };

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(|e| {
                GraphError::Connection(format!(
                    "Failed to use namespace '{}' and database '{}': {}",
                    config.namespace, config.database, e
                ))
            })?;

        info!(
            "Opened SurrealDB graph at {} ({}/{})",
            if config.path.is_empty() { ":memory:" } else { config.path.as_str() },
            config.namespace,
            config.database
        );

        Ok(Self {
            inner: Arc::new(ConnectorInner { db, config }),
        })
    }

    /// In-memory database, mainly for tests
    pub async fn new_memory() -> GraphResult<Self> {
        Self::new(SurrealGraphConfig {
            path: ":memory:".to_string(),
            ..Default::default()
        })
        .await
    }

    #[cfg(feature = "rocksdb")]
    async fn open_file(path: &str) -> GraphResult<Surreal<Db>> {
        use surrealdb::engine::local::RocksDb;

        Surreal::new::<RocksDb>(path).await.map_err(|e| {
            GraphError::Connection(format!("Failed to open database at {}: {}", path, e))
        })
    }

    #[cfg(not(feature = "rocksdb"))]
    async fn open_file(path: &str) -> GraphResult<Surreal<Db>> {
        Err(GraphError::Connection(format!(
            "Cannot open {}: built without the `rocksdb` feature; use \":memory:\"",
            path
        )))
    }

    /// Underlying database handle
    pub fn db(&self) -> &Surreal<Db> {
        &self.inner.db
    }

    /// Checkpoint store sharing this database
    pub fn checkpoint_store(&self) -> SurrealCheckpointStore {
        SurrealCheckpointStore::new(self.inner.db.clone())
    }
}

#[async_trait]
impl GraphConnector for SurrealGraphConnector {
    async fn connect(&self) -> GraphResult<Box<dyn GraphSession>> {
        let db = self.inner.db.clone();
        db.use_ns(&self.inner.config.namespace)
            .use_db(&self.inner.config.database)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        debug!("Opened SurrealDB session");
        Ok(Box::new(SurrealGraphSession {
            db,
            open: AtomicBool::new(true),
        }))
    }

    fn name(&self) -> &'static str {
        "surrealdb"
    }
}

/// One session on the embedded database
pub struct SurrealGraphSession {
    db: Surreal<Db>,
    open: AtomicBool,
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: u64,
}

#[derive(Debug, Default, Deserialize)]
struct DbInfo {
    #[serde(default)]
    tables: BTreeMap<String, Value>,
}

impl SurrealGraphSession {
    fn ensure_open(&self) -> GraphResult<()> {
        if self.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(GraphError::SessionExpired("session was closed".to_string()))
        }
    }

    async fn run(&self, sql: &str) -> GraphResult<()> {
        self.db
            .query(sql)
            .await
            .map_err(classify_error)?
            .check()
            .map_err(classify_error)?;
        Ok(())
    }

    async fn table_names(&self) -> GraphResult<Vec<String>> {
        let mut response = self
            .db
            .query("INFO FOR DB")
            .await
            .map_err(classify_error)?
            .check()
            .map_err(classify_error)?;
        let info: Option<DbInfo> = response.take(0).map_err(classify_error)?;
        Ok(info.unwrap_or_default().tables.into_keys().collect())
    }
}

#[async_trait]
impl GraphSession for SurrealGraphSession {
    async fn ensure_schema(&self) -> GraphResult<()> {
        self.ensure_open()?;
        self.run(queries::ENSURE_SCHEMA).await.map_err(|e| match e {
            GraphError::Internal(message) | GraphError::Query(message) => {
                GraphError::Schema(message)
            }
            other => other,
        })?;
        debug!("Schema ensured");
        Ok(())
    }

    async fn reset(&self, mode: ResetMode) -> GraphResult<()> {
        self.ensure_open()?;
        match mode {
            ResetMode::None => Ok(()),
            ResetMode::Scoped => {
                self.run(queries::RESET_SCOPED).await?;
                info!("Deleted tables: {}", MODEL_TABLES.join(", "));
                Ok(())
            }
            ResetMode::All => {
                let tables: Vec<String> = self
                    .table_names()
                    .await?
                    .into_iter()
                    .filter(|t| t != CHECKPOINT_TABLE)
                    .collect();
                for table in &tables {
                    self.db
                        .query("DELETE type::table($table)")
                        .bind(("table", table.clone()))
                        .await
                        .map_err(classify_error)?
                        .check()
                        .map_err(classify_error)?;
                }
                info!("Deleted {} tables", tables.len());
                Ok(())
            }
        }
    }

    async fn merge_property(&self, record: &PropertyRecord) -> GraphResult<()> {
        self.ensure_open()?;

        let sql = queries::merge_property(record);
        let mut query = self
            .db
            .query(sql)
            .bind(("zpid", record.zpid))
            .bind(("props", Value::Object(record.properties())));
        if let Some(zip) = &record.zipcode {
            query = query.bind(("zip", zip.clone()));
        }
        if let Some(name) = &record.neighborhood {
            query = query.bind(("neighborhood", name.clone()));
        }

        query
            .await
            .map_err(classify_error)?
            .check()
            .map_err(classify_error)?;
        Ok(())
    }

    async fn counts(&self) -> GraphResult<GraphCounts> {
        self.ensure_open()?;

        let mut response = self
            .db
            .query(queries::COUNTS)
            .await
            .map_err(classify_error)?
            .check()
            .map_err(classify_error)?;

        let mut counts = [0u64; 5];
        for (index, slot) in counts.iter_mut().enumerate() {
            let row: Option<CountRow> = response.take(index).map_err(classify_error)?;
            *slot = row.map(|r| r.count).unwrap_or(0);
        }

        Ok(GraphCounts {
            properties: counts[0],
            zips: counts[1],
            neighborhoods: counts[2],
            in_zip: counts[3],
            in_neighborhood: counts[4],
        })
    }

    async fn close(&self) -> GraphResult<()> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }
}
