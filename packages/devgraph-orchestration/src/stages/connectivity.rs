//! Stage 8: enhanced connectivity. Symbol extraction with content-hash
//! short-circuits, library usage, co-change edges, and the document↔code
//! linking passes.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};

use devgraph_core::features::linking::{
    build_basename_index, build_commit_prefix_index, find_commit_mentions, find_file_mentions,
    hash_commit_mentions, hash_file_mentions,
};
use devgraph_core::features::symbols::{
    extract_python_file, extract_typescript_symbols, symbol_content_hash, SymbolRecord,
};
use devgraph_storage::infrastructure::neo4j::writers::{MentionWriter, SymbolWriter};

use crate::error::{OrchestrationError, Result};
use crate::pipeline::StageContext;

pub async fn run(ctx: &StageContext, force_doc_refresh: bool) -> Result<Value> {
    ctx.token.check()?;
    let started = Instant::now();

    let symbol_payload = extract_and_write_symbols(ctx).await?;

    ctx.token.check()?;
    let linking_payload = link_documents_to_code(ctx, force_doc_refresh).await?;

    Ok(json!({
        "symbols": symbol_payload,
        "doc_linking": linking_payload,
        "force_doc_refresh": force_doc_refresh,
        "duration": started.elapsed().as_secs_f64(),
    }))
}

struct Extraction {
    symbols: Vec<SymbolRecord>,
    file_symbol_map: HashMap<String, Vec<String>>,
    hash_updates: HashMap<String, String>,
    library_usage: HashMap<String, HashMap<String, u32>>,
    files_skipped: usize,
    failures: Vec<Value>,
}

async fn extract_and_write_symbols(ctx: &StageContext) -> Result<Value> {
    let writer = SymbolWriter::new(&ctx.client);
    let candidates = writer
        .code_files_with_hashes(ctx.options.subpath.as_deref())
        .await?;
    let candidate_count = candidates.len();

    let repo_path = ctx.repo_path.clone();
    let extraction = tokio::task::spawn_blocking(move || extract_symbols(&repo_path, candidates))
        .await
        .map_err(|e| OrchestrationError::StageFailed {
            stage: "connectivity",
            message: format!("symbol worker panicked: {}", e),
        })?;

    ctx.token.check()?;
    let seen_at = Utc::now().to_rfc3339();
    let upserted = writer.upsert_symbols(&extraction.symbols).await?;
    let deleted = writer.delete_stale_symbols(&extraction.file_symbol_map).await?;
    writer
        .update_symbol_hashes(&extraction.hash_updates, &seen_at)
        .await?;

    ctx.token.check()?;
    let library_file_links = writer
        .write_library_usage(&extraction.library_usage, &seen_at)
        .await?;
    let co_occurrence = writer.refresh_co_occurrence().await?;

    // Symbol mentions in docs run here so fresh symbols become findable.
    let mention_writer = MentionWriter::new(&ctx.client);
    let symbol_mentions = match mention_writer
        .link_symbol_mentions(&extraction.symbols, &seen_at)
        .await
    {
        Ok(count) => count,
        Err(e) => {
            // Full-text procedures may be unavailable; non-fatal.
            warn!("symbol mention pass skipped: {}", e);
            0
        }
    };

    info!(
        "symbol pass: {} symbols from {} candidates ({} skipped), {} stale deleted",
        extraction.symbols.len(),
        candidate_count,
        extraction.files_skipped,
        deleted
    );

    Ok(json!({
        "candidates": candidate_count,
        "files_processed": extraction.hash_updates.len(),
        "files_skipped": extraction.files_skipped,
        "symbols_extracted": extraction.symbols.len(),
        "symbols_upserted": upserted,
        "symbols_deleted": deleted,
        "library_usage_files": extraction.library_usage.len(),
        "library_file_links": library_file_links,
        "co_occurrence_edges": co_occurrence,
        "symbol_mentions": symbol_mentions,
        "errors": extraction.failures,
    }))
}

fn extract_symbols(repo_path: &Path, candidates: Vec<(String, Option<String>)>) -> Extraction {
    let mut out = Extraction {
        symbols: Vec::new(),
        file_symbol_map: HashMap::new(),
        hash_updates: HashMap::new(),
        library_usage: HashMap::new(),
        files_skipped: 0,
        failures: Vec::new(),
    };

    for (path, stored_hash) in candidates {
        let absolute = repo_path.join(&path);
        let raw = match std::fs::read(&absolute) {
            Ok(raw) => raw,
            Err(e) => {
                if out.failures.len() < super::MAX_FAILURES_RECORDED {
                    out.failures.push(json!({ "path": path, "error": e.to_string() }));
                }
                continue;
            }
        };

        let current_hash = symbol_content_hash(&raw);
        if stored_hash.as_deref() == Some(current_hash.as_str()) {
            out.files_skipped += 1;
            continue;
        }

        let text = String::from_utf8_lossy(&raw).into_owned();
        let extension = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();

        let (symbols, libraries) = match extension.as_str() {
            "py" => match extract_python_file(&path, &text) {
                Ok(extraction) => (extraction.symbols, extraction.libraries),
                Err(e) => {
                    if out.failures.len() < super::MAX_FAILURES_RECORDED {
                        out.failures.push(json!({ "path": path, "error": e.to_string() }));
                    }
                    continue;
                }
            },
            "ts" | "tsx" => {
                let (symbols, libraries) = extract_typescript_symbols(&path, &text, "typescript");
                (symbols, libraries)
            }
            "js" | "jsx" => {
                let (symbols, libraries) = extract_typescript_symbols(&path, &text, "javascript");
                (symbols, libraries)
            }
            _ => continue,
        };

        out.file_symbol_map.insert(
            path.clone(),
            symbols.iter().map(|s| s.symbol_id.clone()).collect(),
        );
        if !libraries.is_empty() {
            out.library_usage.insert(path.clone(), libraries);
        }
        out.symbols.extend(symbols);
        out.hash_updates.insert(path, current_hash);
    }

    out
}

async fn link_documents_to_code(ctx: &StageContext, force_doc_refresh: bool) -> Result<Value> {
    let writer = MentionWriter::new(&ctx.client);
    let seen_at = Utc::now().to_rfc3339();

    let chunks = writer.load_doc_chunks().await?;
    let file_paths = writer.known_file_paths().await?;
    let commit_hashes = writer.known_commit_hashes().await?;

    let repo_name = ctx
        .repo_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_index = build_basename_index(&file_paths, &repo_name);
    let prefix_index = build_commit_prefix_index(&commit_hashes);

    // Delta skip: unchanged mention hashes need no write pass.
    let stored_hashes: HashMap<String, (Option<String>, Option<String>)> = writer
        .mention_hashes()
        .await?
        .into_iter()
        .map(|(id, file_hash, commit_hash)| (id, (file_hash, commit_hash)))
        .collect();

    let mut file_links = 0usize;
    let mut commit_links = 0usize;
    let mut chunks_skipped = 0usize;

    for (chunk_id, text, heading) in &chunks {
        ctx.token.check()?;

        let file_mentions = find_file_mentions(chunk_id, text, heading, &file_index);
        let commit_mentions = find_commit_mentions(chunk_id, text, heading, &prefix_index);

        let (stored_file_hash, stored_commit_hash) = stored_hashes
            .get(chunk_id)
            .cloned()
            .unwrap_or((None, None));
        let unchanged = stored_file_hash == hash_file_mentions(&file_mentions)
            && stored_commit_hash == hash_commit_mentions(&commit_mentions)
            && !force_doc_refresh;
        if unchanged {
            chunks_skipped += 1;
            continue;
        }

        file_links += writer
            .apply_chunk_file_mentions(chunk_id, &file_mentions, &seen_at)
            .await?;
        commit_links += writer
            .apply_chunk_commit_mentions(chunk_id, &commit_mentions, &seen_at)
            .await?;
    }

    ctx.token.check()?;
    let (doc_file_rollups, doc_commit_rollups) = writer.rollup_document_mentions(&seen_at).await?;
    let sprint_file_links = writer.refresh_sprint_file_links(&seen_at).await?;
    let chunk_links = writer.link_doc_chunks_to_code_chunks(&seen_at).await?;

    let library_doc_mentions = if force_doc_refresh {
        match writer.link_library_mentions(&seen_at).await {
            Ok(count) => count,
            Err(e) => {
                warn!("library mention pass skipped: {}", e);
                0
            }
        }
    } else {
        0
    };
    let library_bridges = writer.bridge_library_mentions(&seen_at).await?;

    Ok(json!({
        "doc_chunks_scanned": chunks.len(),
        "chunks_skipped_unchanged": chunks_skipped,
        "chunk_file_links": file_links,
        "chunk_commit_links": commit_links,
        "doc_file_rollups": doc_file_rollups,
        "doc_commit_rollups": doc_commit_rollups,
        "sprint_file_links": sprint_file_links,
        "chunk_links": chunk_links,
        "library_doc_mentions": library_doc_mentions,
        "library_bridges": library_bridges,
    }))
}
