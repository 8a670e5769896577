//! Stage 5: sprint windows from the planning document, INCLUDES and
//! CONTAINS_DOC links, and sprint file rollups.

use std::time::Instant;

use serde_json::{json, Value};
use tracing::warn;

use devgraph_core::features::sprints::{fallback_window, parse_sprint_status, SPRINT_STATUS_PATH};
use devgraph_storage::infrastructure::neo4j::writers::SprintWriter;

use crate::error::Result;
use crate::pipeline::StageContext;

pub async fn run(ctx: &StageContext) -> Result<Value> {
    ctx.token.check()?;
    let started = Instant::now();

    let status_path = ctx.repo_path.join(SPRINT_STATUS_PATH);
    let windows = match std::fs::read_to_string(&status_path) {
        Ok(content) => {
            let windows = parse_sprint_status(&content);
            if windows.is_empty() {
                warn!("no sprint windows parsed from {}", SPRINT_STATUS_PATH);
                vec![fallback_window()]
            } else {
                windows
            }
        }
        Err(_) => {
            warn!("{} missing; using trailing 14-day window", SPRINT_STATUS_PATH);
            vec![fallback_window()]
        }
    };

    let writer = SprintWriter::new(&ctx.client);
    let stats = writer.map_sprints(&windows).await?;

    ctx.token.check()?;
    let rollups = writer.rollup_sprint_file_touches().await?;

    Ok(json!({
        "sprints_mapped": stats.sprints_mapped,
        "commits_linked": stats.commits_linked,
        "documents_linked": stats.documents_linked,
        "file_rollups": rollups,
        "duration": started.elapsed().as_secs_f64(),
    }))
}
