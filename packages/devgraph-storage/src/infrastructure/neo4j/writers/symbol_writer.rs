//! Symbol persistence: UNWIND upsert, stale-symbol deletion keyed by the
//! file's new symbol set, content-hash bookkeeping, co-change aggregation,
//! and library usage edges.

use std::collections::HashMap;

use serde_json::{json, Value};
use tracing::info;

use devgraph_core::features::symbols::SymbolRecord;

use crate::error::Result;
use crate::infrastructure::neo4j::GraphClient;

pub struct SymbolWriter<'a> {
    client: &'a GraphClient,
}

impl<'a> SymbolWriter<'a> {
    pub fn new(client: &'a GraphClient) -> Self {
        Self { client }
    }

    /// Upsert extracted symbols and their DEFINED_IN edges.
    pub async fn upsert_symbols(&self, symbols: &[SymbolRecord]) -> Result<usize> {
        let rows = build_symbol_rows(symbols);
        self.client
            .run_batched(
                "UNWIND $rows AS row
                 MERGE (s:Symbol {symbol_id: row.symbol_id})
                 SET s.name = row.name,
                     s.qualified_name = row.qualified_name,
                     s.kind = row.kind,
                     s.language = row.language,
                     s.file_path = row.file_path,
                     s.line_number = row.line_number,
                     s.signature = row.signature,
                     s.parent = row.parent,
                     s.docstring = row.docstring,
                     s.doc_preview = row.doc_preview,
                     s.decorators = row.decorators,
                     s.bases = row.bases,
                     s.interfaces = row.interfaces,
                     s.return_type = row.return_type,
                     s.is_async = row.is_async,
                     s.exported = row.exported,
                     s.uid = row.symbol_id
                 MERGE (f:File {path: row.file_path})
                 ON CREATE SET f.uid = row.file_path
                 MERGE (s)-[rel:DEFINED_IN]->(f)
                 SET rel.last_seen = row.seen_at",
                rows,
            )
            .await
    }

    /// Delete symbols of the given files that are absent from the new
    /// extraction.
    pub async fn delete_stale_symbols(
        &self,
        file_symbol_map: &HashMap<String, Vec<String>>,
    ) -> Result<i64> {
        let rows: Vec<Value> = file_symbol_map
            .iter()
            .map(|(path, ids)| json!({ "file_path": path, "symbol_ids": ids }))
            .collect();
        if rows.is_empty() {
            return Ok(0);
        }
        let mut deleted = 0i64;
        for batch in rows.chunks(super::super::BATCH_SIZE) {
            deleted += self
                .client
                .execute_count(
                    "UNWIND $rows AS row
                     MATCH (s:Symbol {file_path: row.file_path})
                     WHERE NOT s.symbol_id IN row.symbol_ids
                     DETACH DELETE s
                     RETURN count(s) AS value",
                    json!({ "rows": batch }),
                )
                .await?;
        }
        Ok(deleted)
    }

    /// Record `symbol_hash` and the indexing marker on each processed file.
    pub async fn update_symbol_hashes(
        &self,
        hashes: &HashMap<String, String>,
        seen_at: &str,
    ) -> Result<usize> {
        let rows: Vec<Value> = hashes
            .iter()
            .map(|(path, hash)| {
                json!({ "file_path": path, "hash": hash, "seen_at": seen_at })
            })
            .collect();
        self.client
            .run_batched(
                "UNWIND $rows AS row
                 MERGE (f:File {path: row.file_path})
                 ON CREATE SET f.uid = row.file_path
                 SET f.symbol_hash = row.hash,
                     f.symbol_last_indexed_at = row.seen_at",
                rows,
            )
            .await
    }

    /// Code files with their stored symbol hash, for delta short-circuits.
    pub async fn code_files_with_hashes(
        &self,
        subpath: Option<&str>,
    ) -> Result<Vec<(String, Option<String>)>> {
        let (clause, params) = match subpath {
            Some(prefix) => (
                "AND f.path STARTS WITH $subpath",
                json!({ "subpath": prefix }),
            ),
            None => ("", json!({})),
        };
        let cypher = format!(
            "MATCH (f:File)
             WHERE coalesce(f.is_code, false) {}
             RETURN {{path: f.path, symbol_hash: f.symbol_hash}} AS value
             ORDER BY value.path",
            clause
        );
        let rows = self.client.execute_values(&cypher, params).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let path = row.get("path")?.as_str()?.to_string();
                let hash = row
                    .get("symbol_hash")
                    .and_then(|h| h.as_str())
                    .map(String::from);
                Some((path, hash))
            })
            .collect())
    }

    /// `CO_OCCURS_WITH` between file pairs touched by the same commits:
    /// lexicographic pair direction, weight = common commits, kept only
    /// above one.
    pub async fn refresh_co_occurrence(&self) -> Result<i64> {
        let count = self
            .client
            .execute_count(
                "MATCH (c:GitCommit)-[:TOUCHED]->(f1:File)
                 MATCH (c)-[:TOUCHED]->(f2:File)
                 WHERE f1.path < f2.path
                 WITH f1, f2, count(DISTINCT c) AS weight
                 WHERE weight > 1
                 MERGE (f1)-[rel:CO_OCCURS_WITH]->(f2)
                 SET rel.weight = weight
                 RETURN count(rel) AS value",
                json!({}),
            )
            .await?;
        info!("co-occurrence refresh touched {} edges", count);
        Ok(count)
    }

    /// `(File)-[:USES_LIBRARY]->(Library)` from import-derived usage, with
    /// removal of libraries the file no longer imports. Returns the number
    /// of usage edges written.
    pub async fn write_library_usage(
        &self,
        usage: &HashMap<String, HashMap<String, u32>>,
        seen_at: &str,
    ) -> Result<usize> {
        let usage_rows: Vec<Value> = usage
            .iter()
            .flat_map(|(path, counts)| {
                counts.iter().map(move |(library, count)| {
                    json!({
                        "file_path": path,
                        "library": library,
                        "count": count,
                        "seen_at": seen_at,
                    })
                })
            })
            .collect();
        let usage_edges_written = self
            .client
            .run_batched(
                "UNWIND $rows AS row
                 MERGE (lib:Library {name: row.library})
                 ON CREATE SET lib.uid = row.library
                 MERGE (f:File {path: row.file_path})
                 ON CREATE SET f.uid = row.file_path
                 SET f.last_library_scan = row.seen_at
                 MERGE (f)-[rel:USES_LIBRARY]->(lib)
                 ON CREATE SET rel.source = 'import'
                 SET rel.count = row.count,
                     rel.last_seen = row.seen_at",
                usage_rows,
            )
            .await?;

        let removal_rows: Vec<Value> = usage
            .iter()
            .map(|(path, counts)| {
                json!({
                    "file_path": path,
                    "libraries": counts.keys().collect::<Vec<_>>(),
                })
            })
            .collect();
        self.client
            .run_batched(
                "UNWIND $rows AS row
                 MATCH (f:File {path: row.file_path})-[rel:USES_LIBRARY]->(lib:Library)
                 WHERE NOT lib.name IN row.libraries
                 DELETE rel",
                removal_rows,
            )
            .await?;

        Ok(usage_edges_written)
    }
}

fn build_symbol_rows(symbols: &[SymbolRecord]) -> Vec<Value> {
    let seen_at = chrono::Utc::now().to_rfc3339();
    symbols
        .iter()
        .map(|s| {
            json!({
                "symbol_id": s.symbol_id,
                "name": s.name,
                "qualified_name": s.qualified_name,
                "kind": s.kind.as_str(),
                "language": s.language,
                "file_path": s.file_path,
                "line_number": s.line_number,
                "signature": s.signature,
                "parent": s.parent,
                "docstring": s.docstring,
                "doc_preview": s.doc_preview,
                "decorators": s.decorators,
                "bases": s.bases,
                "interfaces": s.interfaces,
                "return_type": s.return_type,
                "is_async": s.is_async,
                "exported": s.exported,
                "seen_at": seen_at,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use devgraph_core::features::symbols::domain::SymbolKind;

    #[test]
    fn test_symbol_rows_shape() {
        let mut symbol = SymbolRecord::new(
            "src/app.py",
            SymbolKind::Method,
            "run",
            "App.run",
            "python",
            12,
        );
        symbol.parent = Some("App".into());
        symbol.signature = "(self)".into();
        symbol.decorators = vec!["cached".into()];

        let rows = build_symbol_rows(&[symbol]);
        assert_eq!(rows[0]["symbol_id"], "src/app.py::method::App.run");
        assert_eq!(rows[0]["kind"], "method");
        assert_eq!(rows[0]["line_number"], 12);
        assert_eq!(rows[0]["decorators"][0], "cached");
        assert_eq!(rows[0]["exported"], Value::Null);
    }
}
