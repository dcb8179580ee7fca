//! Graph connector and session over Bolt

use crate::cypher::{self, MergeStep};
use crate::error::classify;
use async_trait::async_trait;
use neo4rs::{query, BoltType, ConfigBuilder, Graph, Query};
use propgraph_config::Neo4jGraphConfig;
use propgraph_core::{
    GraphConnector, GraphCounts, GraphError, GraphResult, GraphSession, PropertyRecord, ResetMode,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Opens a new driver connection per session
#[derive(Debug, Clone)]
pub struct Neo4jGraphConnector {
    config: Neo4jGraphConfig,
}

impl Neo4jGraphConnector {
    pub fn new(config: Neo4jGraphConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl GraphConnector for Neo4jGraphConnector {
    async fn connect(&self) -> GraphResult<Box<dyn GraphSession>> {
        let password = self
            .config
            .password
            .clone()
            .ok_or_else(|| GraphError::Connection("Neo4j password is not configured".to_string()))?;

        let mut builder = ConfigBuilder::default()
            .uri(self.config.uri.clone())
            .user(self.config.user.clone())
            .password(password);
        if let Some(db) = &self.config.database {
            builder = builder.db(db.clone());
        }
        let config = builder.build().map_err(classify)?;
        let graph = Graph::connect(config).await.map_err(classify)?;

        debug!("Connected to Neo4j at {}", self.config.uri);
        Ok(Box::new(Neo4jGraphSession {
            graph,
            open: AtomicBool::new(true),
        }))
    }

    fn name(&self) -> &'static str {
        "neo4j"
    }
}

/// One driver connection pool used as a session
pub struct Neo4jGraphSession {
    graph: Graph,
    open: AtomicBool,
}

impl Neo4jGraphSession {
    fn ensure_open(&self) -> GraphResult<()> {
        if self.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(GraphError::SessionExpired("session was closed".to_string()))
        }
    }

    fn step_query(step: MergeStep, record: &PropertyRecord) -> Query {
        let q = query(step.cypher()).param("zpid", record.zpid);
        match step {
            MergeStep::Property => q.param("props", property_map(record)),
            MergeStep::Zip => q.param("code", record.zipcode.clone().unwrap_or_default()),
            MergeStep::Neighborhood => {
                q.param("name", record.neighborhood.clone().unwrap_or_default())
            }
        }
    }
}

/// Record attributes as a Bolt map; absent values are left out so `SET p =`
/// removes them
fn property_map(record: &PropertyRecord) -> HashMap<String, BoltType> {
    record
        .properties()
        .into_iter()
        .filter_map(|(key, value)| {
            let bolt: BoltType = match value {
                Value::String(s) => s.into(),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => i.into(),
                    None => n.as_f64()?.into(),
                },
                Value::Bool(b) => b.into(),
                _ => return None,
            };
            Some((key, bolt))
        })
        .collect()
}

#[async_trait]
impl GraphSession for Neo4jGraphSession {
    async fn ensure_schema(&self) -> GraphResult<()> {
        self.ensure_open()?;
        for statement in cypher::SCHEMA {
            self.graph
                .run(query(statement))
                .await
                .map_err(|e| match classify(e) {
                    GraphError::Query(message) | GraphError::Internal(message) => {
                        GraphError::Schema(message)
                    }
                    other => other,
                })?;
        }
        debug!("Schema ensured");
        Ok(())
    }

    async fn reset(&self, mode: ResetMode) -> GraphResult<()> {
        self.ensure_open()?;
        if let Some(statement) = cypher::reset(mode) {
            self.graph.run(query(statement)).await.map_err(classify)?;
            info!("Graph reset ({})", mode);
        }
        Ok(())
    }

    async fn merge_property(&self, record: &PropertyRecord) -> GraphResult<()> {
        self.ensure_open()?;

        let mut txn = self.graph.start_txn().await.map_err(classify)?;
        for step in cypher::merge_steps(record) {
            if let Err(e) = txn.run(Self::step_query(step, record)).await {
                let error = classify(e);
                if let Err(rollback) = txn.rollback().await {
                    warn!("Rollback after failed merge of {} failed: {}", record.zpid, rollback);
                }
                return Err(error);
            }
        }
        txn.commit().await.map_err(classify)
    }

    async fn counts(&self) -> GraphResult<GraphCounts> {
        self.ensure_open()?;

        let mut values = [0u64; 5];
        for (slot, (_, statement)) in values.iter_mut().zip(cypher::COUNTS) {
            let mut rows = self.graph.execute(query(statement)).await.map_err(classify)?;
            if let Some(row) = rows.next().await.map_err(classify)? {
                let count: i64 = row
                    .get("c")
                    .map_err(|e| GraphError::Internal(format!("Unexpected count row: {}", e)))?;
                *slot = count.max(0) as u64;
            }
        }

        Ok(GraphCounts {
            properties: values[0],
            zips: values[1],
            neighborhoods: values[2],
            in_zip: values[3],
            in_neighborhood: values[4],
        })
    }

    async fn close(&self) -> GraphResult<()> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }
}
