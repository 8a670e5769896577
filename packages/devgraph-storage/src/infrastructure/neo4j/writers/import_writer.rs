//! IMPORTS edge refresh. Each run tags its edges with a fresh `run_id`;
//! edges from processed sources that kept the old tag are stale and
//! removed afterwards.

use std::collections::HashSet;

use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use devgraph_core::features::imports::ImportEdge;

use crate::error::Result;
use crate::infrastructure::neo4j::GraphClient;

#[derive(Debug, Clone, Default)]
pub struct ImportWriteStats {
    pub run_id: String,
    pub relationships_upserted: usize,
    pub relationships_deleted: i64,
}

pub struct ImportWriter<'a> {
    client: &'a GraphClient,
}

impl<'a> ImportWriter<'a> {
    pub fn new(client: &'a GraphClient) -> Self {
        Self { client }
    }

    pub async fn refresh(
        &self,
        edges: &[ImportEdge],
        processed_paths: &HashSet<String>,
    ) -> Result<ImportWriteStats> {
        let run_id = Uuid::new_v4().to_string();
        let seen_at = chrono::Utc::now().to_rfc3339();
        let mut stats = ImportWriteStats {
            run_id: run_id.clone(),
            ..Default::default()
        };

        let rows = build_import_rows(edges, &run_id, &seen_at);
        stats.relationships_upserted = self
            .client
            .run_batched(
                "UNWIND $rows AS row
                 MATCH (src:File {path: row.source})
                 MATCH (dst:File {path: row.target})
                 MERGE (src)-[rel:IMPORTS]->(dst)
                 ON CREATE SET rel.source = 'static-analysis'
                 SET rel.language = row.language,
                     rel.modules = row.modules,
                     rel.symbols = row.symbols,
                     rel.lines = row.lines,
                     rel.count = row.count,
                     rel.last_seen = row.seen_at,
                     rel.run_id = row.run_id",
                rows,
            )
            .await?;

        if !processed_paths.is_empty() {
            let paths: Vec<&String> = processed_paths.iter().collect();
            stats.relationships_deleted = self
                .client
                .execute_count(
                    "MATCH (src:File)-[rel:IMPORTS]->(:File)
                     WHERE src.path IN $paths
                       AND (rel.run_id IS NULL OR rel.run_id <> $run_id)
                     DELETE rel
                     RETURN count(rel) AS value",
                    json!({ "paths": paths, "run_id": run_id }),
                )
                .await?;
        }

        info!(
            "import graph refresh {}: upserted {}, deleted {}",
            stats.run_id, stats.relationships_upserted, stats.relationships_deleted
        );
        Ok(stats)
    }
}

fn build_import_rows(edges: &[ImportEdge], run_id: &str, seen_at: &str) -> Vec<Value> {
    edges
        .iter()
        .map(|edge| {
            json!({
                "source": edge.source,
                "target": edge.target,
                "language": edge.language,
                "modules": edge.modules,
                "symbols": edge.symbols,
                "lines": edge.lines,
                "count": edge.count(),
                "run_id": run_id,
                "seen_at": seen_at,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_rows_shape() {
        let mut edge = ImportEdge::new("pkg/mod.py", "pkg/util.py", "python");
        edge.add(Some("pkg.util"), Some("helper"), Some(4));
        edge.add(Some("pkg.util"), Some("other"), Some(9));

        let rows = build_import_rows(&[edge], "run-1", "2025-01-01T00:00:00Z");
        assert_eq!(rows[0]["source"], "pkg/mod.py");
        assert_eq!(rows[0]["count"], 2);
        assert_eq!(rows[0]["run_id"], "run-1");
        assert_eq!(rows[0]["symbols"][0], "helper");
        assert_eq!(rows[0]["lines"][1], 9);
    }
}
