//! Stage 1: optional full reset, then idempotent schema application.

use std::time::Instant;

use serde_json::{json, Value};
use tracing::info;

use devgraph_storage::SchemaManager;

use crate::error::Result;
use crate::pipeline::StageContext;

pub async fn run(ctx: &StageContext, reset_graph: bool) -> Result<Value> {
    ctx.token.check()?;
    let started = Instant::now();

    if reset_graph {
        ctx.client
            .run("MATCH (n) DETACH DELETE n", json!({}))
            .await?;
        info!("graph reset complete");
    }

    let report = SchemaManager::new(&ctx.client).apply().await?;

    Ok(json!({
        "database_reset": reset_graph,
        "schema_applied": true,
        "schema_statements": report.statements_applied,
        "vector_index_available": report.vector_index_available,
        "vector_index_downgraded": report.vector_index_downgraded,
        "duration": started.elapsed().as_secs_f64(),
    }))
}
