//! Document↔code mention writes: per-chunk MENTIONS_FILE/MENTIONS_COMMIT
//! edges with removal passes and delta-hash markers, document rollups,
//! sprint file links, symbol/library full-text mentions, and the library
//! bridge pass.

use serde_json::{json, Value};
use tracing::info;

use devgraph_core::features::linking::{
    hash_commit_mentions, hash_file_mentions, CommitMention, FileMention,
};
use devgraph_core::features::symbols::domain::SymbolRecord;
use devgraph_core::features::symbols::infrastructure::doc_library_terms;

use crate::error::Result;
use crate::infrastructure::neo4j::GraphClient;

pub struct MentionWriter<'a> {
    client: &'a GraphClient,
}

impl<'a> MentionWriter<'a> {
    pub fn new(client: &'a GraphClient) -> Self {
        Self { client }
    }

    /// Doc chunks with text and heading, for scanning.
    pub async fn load_doc_chunks(&self) -> Result<Vec<(String, String, String)>> {
        let rows = self
            .client
            .execute_values(
                "MATCH (ch:Chunk)
                 WHERE coalesce(ch.kind, 'doc') = 'doc'
                 RETURN {id: ch.id, text: coalesce(ch.text, ''),
                         heading: coalesce(ch.heading, '')} AS value
                 ORDER BY value.id",
                json!({}),
            )
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                Some((
                    row.get("id")?.as_str()?.to_string(),
                    row.get("text")?.as_str().unwrap_or("").to_string(),
                    row.get("heading")?.as_str().unwrap_or("").to_string(),
                ))
            })
            .collect())
    }

    pub async fn known_file_paths(&self) -> Result<Vec<String>> {
        let rows = self
            .client
            .execute_values("MATCH (f:File) RETURN f.path AS value", json!({}))
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect())
    }

    pub async fn known_commit_hashes(&self) -> Result<Vec<String>> {
        let rows = self
            .client
            .execute_values("MATCH (c:GitCommit) RETURN c.hash AS value", json!({}))
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect())
    }

    /// Apply one chunk's file mentions: upsert current, remove stale, and
    /// record the delta-skip hash marker.
    pub async fn apply_chunk_file_mentions(
        &self,
        chunk_id: &str,
        mentions: &[FileMention],
        seen_at: &str,
    ) -> Result<usize> {
        if !mentions.is_empty() {
            let rows: Vec<Value> = mentions
                .iter()
                .map(|m| {
                    json!({
                        "chunk_id": m.chunk_id,
                        "file_path": m.file_path,
                        "term": m.term,
                        "method": m.method,
                        "confidence": m.confidence,
                        "seen_at": seen_at,
                    })
                })
                .collect();
            self.client
                .run_batched(
                    "UNWIND $rows AS row
                     MATCH (ch:Chunk {id: row.chunk_id})
                     MATCH (f:File {path: row.file_path})
                     MERGE (ch)-[rel:MENTIONS_FILE {source: 'doc-text'}]->(f)
                     SET rel.term = row.term,
                         rel.method = row.method,
                         rel.confidence = row.confidence,
                         rel.last_seen = row.seen_at",
                    rows,
                )
                .await?;
        }

        let current_paths: Vec<&str> = mentions.iter().map(|m| m.file_path.as_str()).collect();
        self.client
            .run(
                "MATCH (ch:Chunk {id: $chunk_id})-[rel:MENTIONS_FILE {source: 'doc-text'}]->(f:File)
                 WHERE NOT f.path IN $paths
                 DELETE rel",
                json!({ "chunk_id": chunk_id, "paths": current_paths }),
            )
            .await?;

        self.client
            .run(
                "MATCH (ch:Chunk {id: $chunk_id})
                 SET ch.file_mentions_hash = $hash,
                     ch.file_mentions_count = $count,
                     ch.file_mentions_last = $seen_at",
                json!({
                    "chunk_id": chunk_id,
                    "hash": hash_file_mentions(mentions),
                    "count": mentions.len(),
                    "seen_at": seen_at,
                }),
            )
            .await?;

        Ok(mentions.len())
    }

    /// Apply one chunk's commit mentions, mirroring the file-mention pass.
    pub async fn apply_chunk_commit_mentions(
        &self,
        chunk_id: &str,
        mentions: &[CommitMention],
        seen_at: &str,
    ) -> Result<usize> {
        if !mentions.is_empty() {
            let rows: Vec<Value> = mentions
                .iter()
                .map(|m| {
                    json!({
                        "chunk_id": m.chunk_id,
                        "commit_hash": m.commit_hash,
                        "term": m.term,
                        "method": m.method,
                        "confidence": m.confidence,
                        "seen_at": seen_at,
                    })
                })
                .collect();
            self.client
                .run_batched(
                    "UNWIND $rows AS row
                     MATCH (ch:Chunk {id: row.chunk_id})
                     MATCH (c:GitCommit {hash: row.commit_hash})
                     MERGE (ch)-[rel:MENTIONS_COMMIT {source: 'doc-text'}]->(c)
                     SET rel.term = row.term,
                         rel.method = row.method,
                         rel.confidence = row.confidence,
                         rel.last_seen = row.seen_at",
                    rows,
                )
                .await?;
        }

        let current_hashes: Vec<&str> = mentions.iter().map(|m| m.commit_hash.as_str()).collect();
        self.client
            .run(
                "MATCH (ch:Chunk {id: $chunk_id})-[rel:MENTIONS_COMMIT {source: 'doc-text'}]->(c:GitCommit)
                 WHERE NOT c.hash IN $hashes
                 DELETE rel",
                json!({ "chunk_id": chunk_id, "hashes": current_hashes }),
            )
            .await?;

        self.client
            .run(
                "MATCH (ch:Chunk {id: $chunk_id})
                 SET ch.commit_mentions_hash = $hash,
                     ch.commit_mentions_count = CASE WHEN $count > 0 THEN $count ELSE null END,
                     ch.commit_mentions_last = CASE WHEN $count > 0 THEN $seen_at ELSE null END",
                json!({
                    "chunk_id": chunk_id,
                    "hash": hash_commit_mentions(mentions),
                    "count": mentions.len(),
                    "seen_at": seen_at,
                }),
            )
            .await?;

        Ok(mentions.len())
    }

    /// Stored delta markers per doc chunk.
    pub async fn mention_hashes(&self) -> Result<Vec<(String, Option<String>, Option<String>)>> {
        let rows = self
            .client
            .execute_values(
                "MATCH (ch:Chunk)
                 WHERE coalesce(ch.kind, 'doc') = 'doc'
                 RETURN {id: ch.id, file_hash: ch.file_mentions_hash,
                         commit_hash: ch.commit_mentions_hash} AS value",
                json!({}),
            )
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                Some((
                    row.get("id")?.as_str()?.to_string(),
                    row.get("file_hash").and_then(|v| v.as_str()).map(String::from),
                    row.get("commit_hash").and_then(|v| v.as_str()).map(String::from),
                ))
            })
            .collect())
    }

    /// Document-level rollups over chunk mentions, with removal of rollups
    /// whose chunk evidence disappeared.
    pub async fn rollup_document_mentions(&self, seen_at: &str) -> Result<(i64, i64)> {
        let files = self
            .client
            .execute_count(
                "MATCH (d:Document)-[:CONTAINS_CHUNK]->(ch:Chunk)-[:MENTIONS_FILE {source: 'doc-text'}]->(f:File)
                 WITH d, f, count(DISTINCT ch) AS occurrences
                 MERGE (d)-[rel:MENTIONS_FILE {source: 'doc-text-rollup'}]->(f)
                 SET rel.chunk_occurrences = occurrences,
                     rel.last_seen = $seen_at
                 RETURN count(rel) AS value",
                json!({ "seen_at": seen_at }),
            )
            .await?;
        self.client
            .run(
                "MATCH (d:Document)-[rel:MENTIONS_FILE {source: 'doc-text-rollup'}]->(f:File)
                 WHERE NOT EXISTS {
                     MATCH (d)-[:CONTAINS_CHUNK]->(:Chunk)-[:MENTIONS_FILE {source: 'doc-text'}]->(f)
                 }
                 DELETE rel",
                json!({}),
            )
            .await?;

        let commits = self
            .client
            .execute_count(
                "MATCH (d:Document)-[:CONTAINS_CHUNK]->(ch:Chunk)-[:MENTIONS_COMMIT {source: 'doc-text'}]->(c:GitCommit)
                 WITH d, c, count(DISTINCT ch) AS occurrences
                 MERGE (d)-[rel:MENTIONS_COMMIT {source: 'doc-text-rollup'}]->(c)
                 SET rel.chunk_occurrences = occurrences,
                     rel.last_seen = $seen_at
                 RETURN count(rel) AS value",
                json!({ "seen_at": seen_at }),
            )
            .await?;
        self.client
            .run(
                "MATCH (d:Document)-[rel:MENTIONS_COMMIT {source: 'doc-text-rollup'}]->(c:GitCommit)
                 WHERE NOT EXISTS {
                     MATCH (d)-[:CONTAINS_CHUNK]->(:Chunk)-[:MENTIONS_COMMIT {source: 'doc-text'}]->(c)
                 }
                 DELETE rel",
                json!({}),
            )
            .await?;

        Ok((files, commits))
    }

    /// Refresh `(Sprint)-[:INVOLVES_FILE]->(File)` from commit activity.
    pub async fn refresh_sprint_file_links(&self, seen_at: &str) -> Result<i64> {
        let created = self
            .client
            .execute_count(
                "MATCH (s:Sprint)-[:INCLUDES]->(c:GitCommit)-[:TOUCHED]->(f:File)
                 WITH s, f, count(DISTINCT c) AS commit_count
                 MERGE (s)-[rel:INVOLVES_FILE {source: 'sprint-commits'}]->(f)
                 SET rel.commit_count = commit_count,
                     rel.last_seen = $seen_at
                 RETURN count(rel) AS value",
                json!({ "seen_at": seen_at }),
            )
            .await?;
        self.client
            .run(
                "MATCH (s:Sprint)-[rel:INVOLVES_FILE {source: 'sprint-commits'}]->(f:File)
                 WHERE NOT EXISTS {
                     MATCH (s)-[:INCLUDES]->(:GitCommit)-[:TOUCHED]->(f)
                 }
                 DELETE rel",
                json!({}),
            )
            .await?;
        Ok(created)
    }

    /// Full-text symbol mentions: doc chunks naming a symbol (terms of 3+
    /// chars), deduped per (chunk, symbol), best score kept.
    pub async fn link_symbol_mentions(
        &self,
        symbols: &[SymbolRecord],
        seen_at: &str,
    ) -> Result<i64> {
        let terms = build_symbol_terms(symbols);
        if terms.is_empty() {
            return Ok(0);
        }
        let mut total = 0i64;
        for batch in terms.chunks(super::super::BATCH_SIZE) {
            total += self
                .client
                .execute_count(
                    "UNWIND $rows AS row
                     MATCH (s:Symbol {symbol_id: row.symbol_id})
                     CALL db.index.fulltext.queryNodes('chunk_fulltext', row.term)
                     YIELD node, score
                     WHERE coalesce(node.kind, 'doc') = 'doc'
                     WITH node, s, row, score
                     ORDER BY score DESC
                     WITH DISTINCT node, s, row, collect(score)[0] AS best_score
                     MERGE (node)-[rel:MENTIONS_SYMBOL]->(s)
                     ON CREATE SET rel.term = row.term
                     SET rel.score = best_score,
                         rel.last_seen = $seen_at
                     RETURN count(rel) AS value",
                    json!({ "rows": batch, "seen_at": seen_at }),
                )
                .await?;
        }
        info!("symbol mention pass linked {} chunk mentions", total);
        Ok(total)
    }

    /// Full-text library mentions over the canonical term table.
    pub async fn link_library_mentions(&self, seen_at: &str) -> Result<i64> {
        let rows: Vec<Value> = doc_library_terms()
            .into_iter()
            .map(|(library, term)| json!({ "library": library, "term": term }))
            .collect();
        let total = self
            .client
            .execute_count(
                "UNWIND $rows AS row
                 CALL db.index.fulltext.queryNodes('chunk_fulltext', row.term)
                 YIELD node, score
                 WHERE coalesce(node.kind, 'doc') = 'doc'
                 WITH node, row, score
                 ORDER BY score DESC
                 WITH DISTINCT node, row, collect(score)[0] AS best_score
                 MERGE (lib:Library {name: row.library})
                 ON CREATE SET lib.uid = row.library
                 MERGE (node)-[rel:MENTIONS_LIBRARY]->(lib)
                 ON CREATE SET rel.term = row.term
                 SET rel.score = best_score,
                     rel.last_seen = $seen_at
                 RETURN count(rel) AS value",
                json!({ "rows": rows, "seen_at": seen_at }),
            )
            .await?;
        Ok(total)
    }

    /// Link doc chunks to the code chunks of files they mention. The edge
    /// carries the best mention confidence as its score; the timestamp
    /// makes it admissible in windowed queries.
    pub async fn link_doc_chunks_to_code_chunks(&self, seen_at: &str) -> Result<i64> {
        self.client
            .execute_count(
                "MATCH (dc:Chunk)-[m:MENTIONS_FILE {source: 'doc-text'}]->(f:File)
                 MATCH (f)<-[:PART_OF]-(cc:Chunk {kind: 'code'})
                 WHERE coalesce(dc.kind, 'doc') = 'doc'
                 WITH DISTINCT dc, cc, max(m.confidence) AS best_confidence
                 MERGE (dc)-[rel:LINKS_TO]->(cc)
                 ON CREATE SET rel.method = 'file-mention',
                               rel.sources = ['doc-text'],
                               rel.confidence = best_confidence,
                               rel.timestamp = $seen_at,
                               rel.provenance = 'doc-text'
                 SET rel.score = best_confidence,
                     rel.last_seen = $seen_at
                 RETURN count(rel) AS value",
                json!({ "seen_at": seen_at }),
            )
            .await
    }

    /// Bridge doc chunks mentioning a library to files using it.
    pub async fn bridge_library_mentions(&self, seen_at: &str) -> Result<i64> {
        self.client
            .execute_count(
                "MATCH (ch:Chunk)-[:MENTIONS_LIBRARY]->(lib:Library)<-[:USES_LIBRARY]-(f:File)
                 WHERE coalesce(ch.kind, 'doc') = 'doc'
                 WITH DISTINCT ch, lib, f
                 MERGE (ch)-[rel:RELATES_TO {via: 'library', library: lib.name}]->(f)
                 SET rel.last_seen = $seen_at
                 RETURN count(rel) AS value",
                json!({ "seen_at": seen_at }),
            )
            .await
    }
}

/// Search terms for symbol full-text lookup: name and qualified name,
/// 3+ chars, quoted when they contain whitespace.
fn build_symbol_terms(symbols: &[SymbolRecord]) -> Vec<Value> {
    let mut seen = std::collections::HashSet::new();
    let mut terms = Vec::new();
    for symbol in symbols {
        let mut values = vec![symbol.name.as_str()];
        if symbol.qualified_name != symbol.name {
            values.push(symbol.qualified_name.as_str());
        }
        for value in values {
            let normalized = value.trim();
            if normalized.len() < 3 {
                continue;
            }
            let key = (symbol.symbol_id.clone(), normalized.to_ascii_lowercase());
            if !seen.insert(key) {
                continue;
            }
            let term = if normalized.contains(' ') {
                format!("\"{}\"", normalized)
            } else {
                normalized.to_string()
            };
            terms.push(json!({ "symbol_id": symbol.symbol_id, "term": term }));
        }
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;
    use devgraph_core::features::symbols::domain::SymbolKind;

    #[test]
    fn test_symbol_terms_skip_short_names() {
        let short = SymbolRecord::new("m.py", SymbolKind::Function, "go", "go", "python", 1);
        let long = SymbolRecord::new(
            "m.py",
            SymbolKind::Method,
            "handle",
            "Service.handle",
            "python",
            2,
        );
        let terms = build_symbol_terms(&[short, long]);
        let rendered: Vec<_> = terms.iter().map(|t| t["term"].as_str().unwrap()).collect();
        assert_eq!(rendered, vec!["handle", "Service.handle"]);
    }

    #[test]
    fn test_symbol_terms_dedupe_case_insensitive() {
        let a = SymbolRecord::new("m.py", SymbolKind::Function, "Load", "Load", "python", 1);
        let terms = build_symbol_terms(&[a.clone(), a]);
        assert_eq!(terms.len(), 1);
    }
}
