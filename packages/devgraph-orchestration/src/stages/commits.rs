//! Stage 2: commit ingestion. Parsing and per-file LOC enrichment run in
//! the reader's worker pool; writes are pipelined in batches with stop
//! checks at batch boundaries.

use std::collections::HashSet;
use std::time::Instant;

use serde_json::{json, Value};
use tracing::info;

use devgraph_core::features::git_history::{CommitRecord, CommitSource, GitHistoryReader};
use devgraph_storage::infrastructure::neo4j::writers::CommitWriter;

use crate::error::{OrchestrationError, Result};
use crate::pipeline::StageContext;

/// Commits per write group; the stop flag is honored between groups.
const WRITE_GROUP: usize = 200;

pub struct CommitsOutcome {
    pub payload: Value,
    /// Newest ingested commit hash, the delta watermark for later stages.
    pub last_commit: Option<String>,
    /// Watermark timestamp for `since_timestamp` strategies.
    pub since_timestamp: Option<String>,
    /// Files touched by the ingested commits (delta scope for chunking).
    pub changed_files: Option<HashSet<String>>,
}

pub async fn run(ctx: &StageContext) -> Result<CommitsOutcome> {
    ctx.token.check()?;
    let started = Instant::now();
    let options = &ctx.options;

    // Delta mode limits the log to commits newer than the stored watermark.
    let watermark = if options.is_delta() {
        newest_ingested_commit(ctx).await?
    } else {
        None
    };

    let repo_path = ctx.repo_path.clone();
    let commit_limit = options.commit_limit;
    let workers = options.max_workers;
    let watermark_clone = watermark.clone();

    let commits: Vec<CommitRecord> = tokio::task::spawn_blocking(move || {
        let reader = GitHistoryReader::new(&repo_path)?.with_workers(workers);
        let mut commits = reader.list_commits(commit_limit, None)?;
        if let Some(last) = &watermark_clone {
            commits = reader.filter_since(commits, last);
        }
        reader.enrich_lines_after(&mut commits);
        Ok::<_, devgraph_core::CoreError>(commits)
    })
    .await
    .map_err(|e| OrchestrationError::StageFailed {
        stage: "commits",
        message: format!("worker panicked: {}", e),
    })??;

    let writer = CommitWriter::new(&ctx.client);
    let mut commits_written = 0usize;
    let mut files_processed = 0usize;

    for group in commits.chunks(WRITE_GROUP) {
        ctx.token.check()?;
        let stats = writer.write_commits(group).await?;
        commits_written += stats.commits_written;
        files_processed += stats.files_touched;
    }

    // Ordering runs only after every commit in the ingest is persisted.
    ctx.token.check()?;
    let ordering_edges = writer.write_commit_ordering(&commits).await?;

    let last_commit = commits.first().map(|c| c.hash.clone());
    let since_timestamp = match &watermark {
        Some(_) => commits.iter().map(|c| c.timestamp.clone()).min(),
        None => None,
    };
    let changed_files = options.is_delta().then(|| {
        commits
            .iter()
            .flat_map(|c| c.files.iter().map(|f| f.path.clone()))
            .collect::<HashSet<String>>()
    });

    info!(
        "commit stage: {} commits, {} touches, {} ordering edges",
        commits_written, files_processed, ordering_edges
    );

    Ok(CommitsOutcome {
        payload: json!({
            "commits_ingested": commits_written,
            "files_processed": files_processed,
            "ordering_edges": ordering_edges,
            "last_commit": last_commit.clone(),
            "delta_watermark": watermark,
            "max_workers": workers,
            "duration": started.elapsed().as_secs_f64(),
        }),
        last_commit,
        since_timestamp,
        changed_files,
    })
}

/// The most recently ingested commit hash, if any.
async fn newest_ingested_commit(ctx: &StageContext) -> Result<Option<String>> {
    let value = ctx
        .client
        .execute_value(
            "MATCH (c:GitCommit)
             WHERE c.timestamp IS NOT NULL
             RETURN c.hash AS value
             ORDER BY c.timestamp DESC
             LIMIT 1",
            json!({}),
        )
        .await?;
    Ok(value.and_then(|v| v.as_str().map(String::from)))
}
