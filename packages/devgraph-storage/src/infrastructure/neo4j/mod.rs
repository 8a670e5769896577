//! Neo4j adapter: connection management, batched writes, schema DDL.

pub mod bolt;
pub mod schema;
pub mod writers;

use std::time::Duration;

use neo4rs::{query, Graph};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, StorageError};

use bolt::apply_params;

pub use schema::{SchemaManager, SchemaReport};

/// Rows per write transaction for bulk UNWIND writes.
pub const BATCH_SIZE: usize = 500;
/// Retry attempts for a failing batch.
const BATCH_RETRIES: usize = 3;
/// Base backoff between retries; doubles per attempt.
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Connection settings for the graph store.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: Option<String>,
    pub max_connections: usize,
}

impl GraphConfig {
    pub fn from_env() -> Self {
        Self {
            uri: std::env::var("NEO4J_URI").unwrap_or_else(|_| "bolt://localhost:7687".into()),
            user: std::env::var("NEO4J_USER").unwrap_or_else(|_| "neo4j".into()),
            password: std::env::var("NEO4J_PASSWORD").unwrap_or_default(),
            database: std::env::var("NEO4J_DATABASE").ok(),
            max_connections: 50,
        }
    }
}

/// Typed wrapper over the bolt driver. The sole writer in the system; all
/// writes go through parameterized queries, bulk writes through
/// `UNWIND $rows`.
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    pub async fn connect(config: &GraphConfig) -> Result<Self> {
        let mut builder = neo4rs::ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections)
            .fetch_size(BATCH_SIZE);
        if let Some(db) = &config.database {
            builder = builder.db(db.as_str());
        }
        let driver_config = builder
            .build()
            .map_err(|e| StorageError::new(crate::ErrorKind::Config, e.to_string()))?;

        let graph = Graph::connect(driver_config).await?;
        Ok(Self { graph })
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Run a write statement, discarding rows.
    pub async fn run(&self, cypher: &str, params: Value) -> Result<()> {
        let q = apply_params(query(cypher), &params);
        self.graph.run(q).await?;
        Ok(())
    }

    /// Run a read statement and collect each row's single `value` column.
    ///
    /// Convention: queries passed here project their result with
    /// `RETURN ... AS value`, usually via `properties(...)` or a map/scalar
    /// expression, so rows deserialize uniformly.
    pub async fn execute_values(&self, cypher: &str, params: Value) -> Result<Vec<Value>> {
        let q = apply_params(query(cypher), &params);
        let mut result = self.graph.execute(q).await?;
        let mut rows = Vec::new();
        while let Some(row) = result.next().await? {
            let value: Value = row
                .get("value")
                .map_err(|e| StorageError::query(format!("row decode: {}", e)))?;
            rows.push(value);
        }
        Ok(rows)
    }

    /// Run a read statement returning one `value` column from one row.
    pub async fn execute_value(&self, cypher: &str, params: Value) -> Result<Option<Value>> {
        Ok(self.execute_values(cypher, params).await?.into_iter().next())
    }

    /// Run a counting statement (`RETURN count(...) AS value`).
    pub async fn execute_count(&self, cypher: &str, params: Value) -> Result<i64> {
        let value = self.execute_value(cypher, params).await?;
        Ok(value.and_then(|v| v.as_i64()).unwrap_or(0))
    }

    /// Write `rows` through an `UNWIND $rows` statement in batches.
    ///
    /// Each batch is retried with exponential backoff; exhaustion surfaces
    /// the failing batch index.
    pub async fn run_batched(&self, cypher: &str, rows: Vec<Value>) -> Result<usize> {
        let mut written = 0usize;
        for (batch_index, batch) in rows.chunks(BATCH_SIZE).enumerate() {
            let params = serde_json::json!({ "rows": batch });
            let mut attempt = 0usize;
            loop {
                let q = apply_params(query(cypher), &params);
                match self.graph.run(q).await {
                    Ok(()) => break,
                    Err(e) if attempt + 1 < BATCH_RETRIES => {
                        attempt += 1;
                        let backoff = RETRY_BACKOFF * 2u32.pow(attempt as u32 - 1);
                        warn!(
                            "batch {} attempt {} failed ({}); retrying in {:?}",
                            batch_index, attempt, e, backoff
                        );
                        tokio::time::sleep(backoff).await;
                    }
                    Err(e) => return Err(StorageError::batch_failed(batch_index, e)),
                }
            }
            written += batch.len();
            debug!("batch {} of {} rows committed", batch_index, batch.len());
        }
        Ok(written)
    }

    /// Run several statements inside one explicit transaction. Used where
    /// delete-then-insert must be atomic (chunk and symbol replacement).
    pub async fn run_in_txn(&self, statements: Vec<(String, Value)>) -> Result<()> {
        let mut txn = self.graph.start_txn().await?;
        for (cypher, params) in statements {
            let q = apply_params(query(&cypher), &params);
            txn.run(q)
                .await
                .map_err(|e| StorageError::transaction(format!("txn statement failed: {}", e)))?;
        }
        txn.commit().await?;
        Ok(())
    }
}
