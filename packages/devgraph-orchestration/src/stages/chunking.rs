//! Stage 3: repository discovery and chunking, plus the stage-4 summary
//! view over its code half.

use std::collections::HashSet;
use std::time::Instant;

use serde_json::{json, Value};
use tracing::{info, warn};

use devgraph_core::config::{discover_files, DiscoveredFile, MAX_PARSE_BYTES};
use devgraph_core::features::chunking::{ChunkRecord, CodeChunker, MarkdownChunker};
use devgraph_storage::infrastructure::neo4j::writers::{ChunkWriter, CleanupPass};

use crate::error::Result;
use crate::pipeline::StageContext;
use crate::stages::{MAX_FAILURES_RECORDED, SLOW_FILES_RECORDED};

pub struct ChunkingOutcome {
    pub payload: Value,
    /// Markdown files processed; forces the doc-mention refresh later.
    pub docs_processed: usize,
    /// All discovered paths, for superseded-chunk cleanup.
    pub live_paths: Vec<String>,
}

#[derive(Default)]
struct SideStats {
    discovered: usize,
    selected: usize,
    processed: usize,
    chunks: usize,
    errors: usize,
    delta_filtered: usize,
    skipped_due_to_limit: usize,
    failures: Vec<Value>,
    slow: Vec<(f64, String)>,
    duration: f64,
}

impl SideStats {
    fn record_slow(&mut self, path: &str, seconds: f64) {
        self.slow.push((seconds, path.to_string()));
        self.slow
            .sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        self.slow.truncate(SLOW_FILES_RECORDED);
    }

    fn to_json(&self) -> Value {
        json!({
            "discovered": self.discovered,
            "selected": self.selected,
            "processed": self.processed,
            "chunks": self.chunks,
            "errors": self.errors,
            "delta_filtered": self.delta_filtered,
            "skipped_due_to_limit": self.skipped_due_to_limit,
            "failures": self.failures,
            "slow": self.slow.iter().map(|(s, p)| json!({"path": p, "seconds": s})).collect::<Vec<_>>(),
            "duration": self.duration,
        })
    }
}

pub async fn run(
    ctx: &StageContext,
    changed_files: Option<&HashSet<String>>,
) -> Result<ChunkingOutcome> {
    ctx.token.check()?;
    let started = Instant::now();
    let options = &ctx.options;

    let discovered = discover_files(&ctx.repo_path, options.subpath.as_deref());
    let live_paths: Vec<String> = discovered.iter().map(|f| f.path.clone()).collect();

    let (docs, code): (Vec<_>, Vec<_>) = discovered.into_iter().partition(|f| f.is_doc);

    let markdown = MarkdownChunker::default();
    let code_chunker = CodeChunker::default();
    let writer = ChunkWriter::new(&ctx.client);

    let mut doc_stats = process_side(
        ctx,
        &writer,
        docs,
        options.doc_limit,
        changed_files,
        |path, content| markdown.chunk_document(path, content),
    )
    .await?;
    doc_stats.duration = started.elapsed().as_secs_f64();

    let code_started = Instant::now();
    let mut code_stats = process_side(
        ctx,
        &writer,
        code,
        options.code_limit,
        changed_files,
        |path, content| code_chunker.chunk_file(path, content),
    )
    .await?;
    code_stats.duration = code_started.elapsed().as_secs_f64();

    // Superseded chunks are cleaned after chunking; orphan documents and
    // edgeless files only on full runs.
    ctx.token.check()?;
    let cleanup = CleanupPass::new(&ctx.client);
    let cleanup_payload = if options.is_delta() {
        json!({ "skipped": true, "reason": "delta profile" })
    } else {
        serde_json::to_value(cleanup.run_full(&live_paths).await?)?
    };

    let docs_processed = doc_stats.processed;
    info!(
        "chunking stage: {} doc chunks, {} code chunks",
        doc_stats.chunks, code_stats.chunks
    );

    let payload = json!({
        "documents": doc_stats.to_json(),
        "code_files": code_stats.to_json(),
        "cleanup": cleanup_payload,
        "total_chunks": doc_stats.chunks + code_stats.chunks,
        "total_errors": doc_stats.errors + code_stats.errors,
        "delta_mode": options.is_delta(),
        "subpath": options.subpath.clone(),
        "max_workers": options.max_workers,
        "duration": started.elapsed().as_secs_f64(),
    });

    Ok(ChunkingOutcome {
        payload,
        docs_processed,
        live_paths,
    })
}

/// Stage 4 payload: the code-chunking half of stage 3, surfaced as its own
/// progress entry. No work happens here when chunking covered code.
pub fn code_chunk_summary(chunking_payload: &Value) -> Value {
    let code = chunking_payload.get("code_files").cloned().unwrap_or(json!({}));
    json!({
        "code_files_discovered": code.get("discovered").cloned().unwrap_or(json!(0)),
        "code_files_selected": code.get("selected").cloned().unwrap_or(json!(0)),
        "code_files_processed": code.get("processed").cloned().unwrap_or(json!(0)),
        "code_chunks_created": code.get("chunks").cloned().unwrap_or(json!(0)),
        "code_errors": code.get("errors").cloned().unwrap_or(json!(0)),
        "code_failures": code.get("failures").cloned().unwrap_or(json!([])),
        "duration": code.get("duration").cloned().unwrap_or(json!(0.0)),
    })
}

async fn process_side<F>(
    ctx: &StageContext,
    writer: &ChunkWriter<'_>,
    files: Vec<DiscoveredFile>,
    limit: Option<usize>,
    changed_files: Option<&HashSet<String>>,
    chunk_fn: F,
) -> Result<SideStats>
where
    F: Fn(&str, &str) -> Vec<ChunkRecord>,
{
    let mut stats = SideStats {
        discovered: files.len(),
        ..Default::default()
    };

    let mut selected = Vec::new();
    for file in files {
        if let Some(changed) = changed_files {
            if !changed.contains(&file.path) {
                stats.delta_filtered += 1;
                continue;
            }
        }
        if let Some(limit) = limit {
            if selected.len() >= limit {
                stats.skipped_due_to_limit += 1;
                continue;
            }
        }
        selected.push(file);
    }
    stats.selected = selected.len();

    for file in selected {
        ctx.token.check()?;

        if file.size_bytes > MAX_PARSE_BYTES {
            stats.errors += 1;
            push_failure(&mut stats.failures, &file.path, "file exceeds parse size cap");
            continue;
        }

        let absolute = ctx.repo_path.join(&file.path);
        let content = match std::fs::read(&absolute) {
            Ok(bytes) if bytes.contains(&0) => {
                stats.errors += 1;
                push_failure(&mut stats.failures, &file.path, "binary content");
                continue;
            }
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                stats.errors += 1;
                push_failure(&mut stats.failures, &file.path, &e.to_string());
                continue;
            }
        };

        let file_started = Instant::now();
        let chunks = chunk_fn(&file.path, &content);
        match writer.replace_file_chunks(&file.path, &chunks).await {
            Ok(written) => {
                stats.processed += 1;
                stats.chunks += written;
            }
            Err(e) => {
                warn!("chunk write failed for {}: {}", file.path, e);
                stats.errors += 1;
                push_failure(&mut stats.failures, &file.path, &e.to_string());
            }
        }
        stats.record_slow(&file.path, file_started.elapsed().as_secs_f64());
    }

    Ok(stats)
}

fn push_failure(failures: &mut Vec<Value>, path: &str, error: &str) {
    if failures.len() < MAX_FAILURES_RECORDED {
        failures.push(json!({ "path": path, "error": error }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_code_chunk_summary_projects_code_half() {
        let chunking_payload = json!({
            "documents": {"chunks": 7},
            "code_files": {
                "discovered": 12,
                "selected": 10,
                "processed": 9,
                "chunks": 40,
                "errors": 1,
                "failures": [{"path": "bad.py", "error": "binary content"}],
                "duration": 1.5,
            }
        });
        let summary = code_chunk_summary(&chunking_payload);
        assert_eq!(summary["code_files_discovered"], 12);
        assert_eq!(summary["code_chunks_created"], 40);
        assert_eq!(summary["code_failures"][0]["path"], "bad.py");
        assert_eq!(summary["duration"], 1.5);
    }

    #[test]
    fn test_code_chunk_summary_handles_missing_payload() {
        let summary = code_chunk_summary(&json!({}));
        assert_eq!(summary["code_files_processed"], 0);
        assert_eq!(summary["code_failures"], json!([]));
    }

    #[test]
    fn test_slow_tracking_keeps_top_entries() {
        let mut stats = SideStats::default();
        for i in 0..10 {
            stats.record_slow(&format!("f{}", i), i as f64);
        }
        assert_eq!(stats.slow.len(), SLOW_FILES_RECORDED);
        assert_eq!(stats.slow[0].1, "f9");
    }
}
