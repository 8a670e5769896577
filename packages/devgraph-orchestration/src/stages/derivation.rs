//! Stage 6: the import graph refresh and evidence-based relationship
//! derivation.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use serde_json::{json, Value};
use tracing::{info, warn};

use devgraph_core::config::{discover_files, MAX_PARSE_BYTES};
use devgraph_core::features::imports::{
    build_python_module_index, collect_python_hits, collect_ts_hits, ImportEdge,
};
use devgraph_core::features::symbols::{extract_python_file, infrastructure::extract_ts_imports};
use devgraph_storage::infrastructure::neo4j::writers::{ImportWriter, RelationshipDeriver};

use crate::error::{OrchestrationError, Result};
use crate::pipeline::StageContext;

pub async fn run(ctx: &StageContext, since_timestamp: Option<&str>) -> Result<Value> {
    ctx.token.check()?;
    let started = Instant::now();

    let import_stats = refresh_import_graph(ctx).await?;

    ctx.token.check()?;
    let deriver = RelationshipDeriver::new(&ctx.client);
    let derivation = deriver.derive_all(since_timestamp).await?;

    info!(
        "derivation stage: {} implements, {} evolves_from, {} deprecated_by",
        derivation.implements, derivation.evolves_from, derivation.deprecated_by
    );

    Ok(json!({
        "import_graph": import_stats,
        "implements": derivation.implements,
        "evolves_from": derivation.evolves_from,
        "deprecated_by": derivation.deprecated_by,
        "refactor_annotations": derivation.refactor_annotations,
        "depends_on": derivation.depends_on,
        "depends_on_skipped": derivation.depends_on_skipped,
        "since_timestamp": since_timestamp,
        "duration": started.elapsed().as_secs_f64(),
    }))
}

/// Parse every tracked code file's imports, resolve them against the
/// repository, and refresh the IMPORTS edges.
async fn refresh_import_graph(ctx: &StageContext) -> Result<Value> {
    let repo_path = ctx.repo_path.clone();
    let subpath = ctx.options.subpath.clone();

    // Parsing is CPU-bound; run the whole resolution off the runtime.
    let (edges, processed, failures, statements) =
        tokio::task::spawn_blocking(move || collect_import_edges(&repo_path, subpath.as_deref()))
            .await
            .map_err(|e| OrchestrationError::StageFailed {
                stage: "derivation",
                message: format!("import worker panicked: {}", e),
            })?;

    ctx.token.check()?;
    let writer = ImportWriter::new(&ctx.client);
    let stats = writer.refresh(&edges, &processed).await?;

    Ok(json!({
        "files_processed": processed.len(),
        "edges_resolved": edges.len(),
        "import_statements": statements,
        "relationships_upserted": stats.relationships_upserted,
        "relationships_deleted": stats.relationships_deleted,
        "run_id": stats.run_id,
        "error_count": failures.len(),
        "errors": failures,
    }))
}

type ImportCollection = (Vec<ImportEdge>, HashSet<String>, Vec<Value>, usize);

fn collect_import_edges(repo_path: &std::path::Path, subpath: Option<&str>) -> ImportCollection {
    let code_files: Vec<_> = discover_files(repo_path, subpath)
        .into_iter()
        .filter(|f| f.is_code && f.size_bytes <= MAX_PARSE_BYTES)
        .collect();

    let all_paths: Vec<String> = code_files.iter().map(|f| f.path.clone()).collect();
    let path_index: HashSet<String> = all_paths.iter().cloned().collect();
    let module_index = build_python_module_index(&all_paths);

    let mut edges: HashMap<(String, String), ImportEdge> = HashMap::new();
    let mut processed: HashSet<String> = HashSet::new();
    let mut failures: Vec<Value> = Vec::new();
    let mut statements = 0usize;

    for file in &code_files {
        let absolute = repo_path.join(&file.path);
        let content = match std::fs::read_to_string(&absolute) {
            Ok(content) => content,
            Err(e) => {
                if failures.len() < super::MAX_FAILURES_RECORDED {
                    failures.push(json!({ "path": file.path, "error": e.to_string() }));
                }
                continue;
            }
        };

        let (hits, language) = if file.extension == "py" {
            match extract_python_file(&file.path, &content) {
                Ok(extraction) => (
                    collect_python_hits(&file.path, &extraction.imports, &module_index),
                    "python",
                ),
                Err(e) => {
                    warn!("import parse failed for {}: {}", file.path, e);
                    if failures.len() < super::MAX_FAILURES_RECORDED {
                        failures.push(json!({ "path": file.path, "error": e.to_string() }));
                    }
                    continue;
                }
            }
        } else {
            let imports = extract_ts_imports(&content);
            (
                collect_ts_hits(&file.path, &imports, &path_index),
                if file.extension.starts_with("ts") {
                    "typescript"
                } else {
                    "javascript"
                },
            )
        };

        processed.insert(file.path.clone());
        for hit in hits {
            statements += 1;
            let key = (file.path.clone(), hit.target.clone());
            let edge = edges
                .entry(key)
                .or_insert_with(|| ImportEdge::new(&file.path, &hit.target, language));
            edge.add(hit.module.as_deref(), hit.symbol.as_deref(), hit.line);
        }
    }

    let mut edges: Vec<ImportEdge> = edges.into_values().collect();
    edges.sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));
    (edges, processed, failures, statements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_import_edges_resolves_local_imports() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("pkg")).unwrap();
        std::fs::write(dir.path().join("pkg/__init__.py"), "").unwrap();
        std::fs::write(dir.path().join("pkg/util.py"), "def helper():\n    pass\n").unwrap();
        std::fs::write(
            dir.path().join("pkg/mod.py"),
            "from .util import helper\nimport os\n",
        )
        .unwrap();

        let (edges, processed, failures, statements) = collect_import_edges(dir.path(), None);
        assert!(failures.is_empty());
        assert_eq!(processed.len(), 3);
        // `import os` does not resolve to a repository file.
        assert_eq!(statements, 1);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source, "pkg/mod.py");
        assert_eq!(edges[0].target, "pkg/util.py");
        assert!(edges[0].symbols.contains("helper"));
    }

    #[test]
    fn test_collect_import_edges_ts_relative() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/util.ts"), "export const x = 1;\n").unwrap();
        std::fs::write(
            dir.path().join("src/app.ts"),
            "import { x } from './util';\nimport React from 'react';\n",
        )
        .unwrap();

        let (edges, _, _, _) = collect_import_edges(dir.path(), None);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source, "src/app.ts");
        assert_eq!(edges[0].target, "src/util.ts");
        assert_eq!(edges[0].language, "typescript");
    }
}
