//! Evidence-based relationship derivation. Each strategy emits edges with
//! `sources[]` and `confidence`; confidence combines across distinct
//! evidence kinds by noisy-OR, applied in Cypher so concurrent strategies
//! compose.

use serde_json::{json, Value};
use tracing::info;

use devgraph_core::features::derivation::{
    base_confidence, deprecation_pairs, extract_requirement_ids, test_colocation_target,
    EvidenceKind,
};

use crate::error::Result;
use crate::infrastructure::neo4j::GraphClient;

#[derive(Debug, Clone, Default)]
pub struct DerivationStats {
    pub implements: i64,
    pub evolves_from: i64,
    pub deprecated_by: i64,
    pub refactor_annotations: i64,
    pub depends_on: i64,
    pub depends_on_skipped: bool,
}

/// MERGE an IMPLEMENTS edge with one evidence kind, accumulating sources
/// as a set and strengthening confidence only for new kinds.
fn implements_cypher() -> &'static str {
    "UNWIND $rows AS row
     MERGE (r:Requirement {id: row.requirement_id})
     ON CREATE SET r.uid = row.requirement_id
     MERGE (f:File {path: row.file_path})
     ON CREATE SET f.uid = row.file_path
     MERGE (r)-[rel:IMPLEMENTS]->(f)
     ON CREATE SET rel.sources = [row.kind],
                   rel.confidence = row.confidence,
                   rel.commit = row.commit_hash,
                   rel.timestamp = row.timestamp,
                   rel.provenance = row.kind
     ON MATCH SET rel.confidence = CASE
                       WHEN row.kind IN coalesce(rel.sources, []) THEN rel.confidence
                       ELSE 1 - (1 - coalesce(rel.confidence, 0.0)) * (1 - row.confidence)
                   END,
                  rel.sources = CASE
                       WHEN row.kind IN coalesce(rel.sources, []) THEN rel.sources
                       ELSE coalesce(rel.sources, []) + row.kind
                   END,
                  rel.commit = coalesce(rel.commit, row.commit_hash),
                  rel.timestamp = coalesce(rel.timestamp, row.timestamp)"
}

pub struct RelationshipDeriver<'a> {
    client: &'a GraphClient,
}

impl<'a> RelationshipDeriver<'a> {
    pub fn new(client: &'a GraphClient) -> Self {
        Self { client }
    }

    pub async fn derive_all(&self, since_timestamp: Option<&str>) -> Result<DerivationStats> {
        let stats = DerivationStats {
            implements: self.derive_implements_commit_message(since_timestamp).await?
                + self.derive_implements_doc_mention().await?
                + self.derive_implements_test_colocation().await?,
            evolves_from: self.derive_evolves_from(since_timestamp).await?,
            deprecated_by: self.derive_deprecated_by(since_timestamp).await?,
            refactor_annotations: self.annotate_refactors().await?,
            depends_on: 0,
            depends_on_skipped: true,
        };
        info!(
            "derivation: {} implements, {} evolves_from, depends_on skipped",
            stats.implements, stats.evolves_from
        );
        Ok(stats)
    }

    /// Commit-message evidence: a requirement ID in a commit's message
    /// implicates every file that commit touched. Base confidence 0.9.
    pub async fn derive_implements_commit_message(
        &self,
        since_timestamp: Option<&str>,
    ) -> Result<i64> {
        let commits = self.commits_with_files(since_timestamp).await?;
        let mut rows = Vec::new();
        for (hash, message, timestamp, files) in &commits {
            for requirement_id in extract_requirement_ids(message) {
                for file_path in files {
                    rows.push(json!({
                        "requirement_id": requirement_id,
                        "file_path": file_path,
                        "kind": EvidenceKind::CommitMessage.as_str(),
                        "confidence": base_confidence(EvidenceKind::CommitMessage),
                        "commit_hash": hash,
                        "timestamp": timestamp,
                    }));
                }
            }
        }
        let count = rows.len() as i64;
        self.client.run_batched(implements_cypher(), rows).await?;
        Ok(count)
    }

    /// Doc-mention evidence: a requirement mentioned by a chunk whose
    /// document references the file. Base confidence 0.6; timestamps
    /// backfill later from TOUCHED.
    pub async fn derive_implements_doc_mention(&self) -> Result<i64> {
        self.client
            .execute_count(
                "MATCH (r:Requirement)<-[:MENTIONS]-(ch:Chunk)<-[:CONTAINS_CHUNK]-(d:Document)
                 MATCH (d)-[:MENTIONS_FILE]->(f:File)
                 WITH DISTINCT r, f
                 MERGE (r)-[rel:IMPLEMENTS]->(f)
                 ON CREATE SET rel.sources = ['doc-mention'],
                               rel.confidence = 0.6,
                               rel.provenance = 'doc-mention'
                 ON MATCH SET rel.confidence = CASE
                                   WHEN 'doc-mention' IN coalesce(rel.sources, []) THEN rel.confidence
                                   ELSE 1 - (1 - coalesce(rel.confidence, 0.0)) * (1 - 0.6)
                               END,
                              rel.sources = CASE
                                   WHEN 'doc-mention' IN coalesce(rel.sources, []) THEN rel.sources
                                   ELSE coalesce(rel.sources, []) + 'doc-mention'
                               END
                 RETURN count(rel) AS value",
                json!({}),
            )
            .await
    }

    /// Test-colocation heuristic: `tests/test_foo.py` pairs with a unique
    /// `foo.py`, implicating the tested file for every requirement the
    /// test file already implements. Base confidence 0.5.
    pub async fn derive_implements_test_colocation(&self) -> Result<i64> {
        let paths = self.code_file_paths().await?;
        let pairs = colocation_pairs(&paths);
        if pairs.is_empty() {
            return Ok(0);
        }
        let rows: Vec<Value> = pairs
            .iter()
            .map(|(test_path, target_path)| {
                json!({
                    "test_path": test_path,
                    "target_path": target_path,
                    "confidence": base_confidence(EvidenceKind::TestColocation),
                })
            })
            .collect();
        let mut total = 0i64;
        for batch in rows.chunks(super::super::BATCH_SIZE) {
            total += self
                .client
                .execute_count(
                    "UNWIND $rows AS row
                     MATCH (r:Requirement)-[:IMPLEMENTS]->(t:File {path: row.test_path})
                     MATCH (f:File {path: row.target_path})
                     MERGE (r)-[rel:IMPLEMENTS]->(f)
                     ON CREATE SET rel.sources = ['test-colocation'],
                                   rel.confidence = row.confidence,
                                   rel.provenance = 'test-colocation'
                     ON MATCH SET rel.confidence = CASE
                                       WHEN 'test-colocation' IN coalesce(rel.sources, []) THEN rel.confidence
                                       ELSE 1 - (1 - coalesce(rel.confidence, 0.0)) * (1 - row.confidence)
                                   END,
                                  rel.sources = CASE
                                       WHEN 'test-colocation' IN coalesce(rel.sources, []) THEN rel.sources
                                       ELSE coalesce(rel.sources, []) + 'test-colocation'
                                   END
                     RETURN count(rel) AS value",
                    json!({ "rows": batch }),
                )
                .await?;
        }
        Ok(total)
    }

    /// EVOLVES_FROM when a message mentions two or more requirement IDs:
    /// earliest-by-position → latest, base confidence 0.7.
    pub async fn derive_evolves_from(&self, since_timestamp: Option<&str>) -> Result<i64> {
        let commits = self.commits_with_files(since_timestamp).await?;
        let mut rows = Vec::new();
        for (hash, message, timestamp, _) in &commits {
            let ids = extract_requirement_ids(message);
            if ids.len() < 2 || ids[0] == ids[1] {
                continue;
            }
            rows.push(json!({
                "new_id": ids[0],
                "old_id": ids[1],
                "commit_hash": hash,
                "timestamp": timestamp,
            }));
        }
        let count = rows.len() as i64;
        self.client
            .run_batched(
                "UNWIND $rows AS row
                 MERGE (n:Requirement {id: row.new_id})
                 ON CREATE SET n.uid = row.new_id
                 MERGE (o:Requirement {id: row.old_id})
                 ON CREATE SET o.uid = row.old_id
                 MERGE (n)-[rel:EVOLVES_FROM]->(o)
                 ON CREATE SET rel.commit = row.commit_hash,
                               rel.timestamp = row.timestamp,
                               rel.sources = ['commit-message'],
                               rel.confidence = 0.7
                 ON MATCH SET rel.timestamp = coalesce(rel.timestamp, row.timestamp)",
                rows,
            )
            .await?;
        Ok(count)
    }

    /// DEPRECATED_BY from explicit `deprecate <OLD> in favor of <NEW>`
    /// message patterns.
    pub async fn derive_deprecated_by(&self, since_timestamp: Option<&str>) -> Result<i64> {
        let commits = self.commits_with_files(since_timestamp).await?;
        let mut rows = Vec::new();
        for (hash, message, timestamp, _) in &commits {
            for (old_id, new_id) in deprecation_pairs(message) {
                rows.push(json!({
                    "old_id": old_id,
                    "new_id": new_id,
                    "commit_hash": hash,
                    "timestamp": timestamp,
                }));
            }
        }
        let count = rows.len() as i64;
        self.client
            .run_batched(
                "UNWIND $rows AS row
                 MERGE (o:Requirement {id: row.old_id})
                 ON CREATE SET o.uid = row.old_id
                 MERGE (n:Requirement {id: row.new_id})
                 ON CREATE SET n.uid = row.new_id
                 MERGE (o)-[rel:DEPRECATED_BY]->(n)
                 ON CREATE SET rel.commit = row.commit_hash,
                               rel.reason = 'commit_message',
                               rel.timestamp = row.timestamp
                 ON MATCH SET rel.timestamp = coalesce(rel.timestamp, row.timestamp)",
                rows,
            )
            .await?;
        Ok(count)
    }

    /// Annotate rename refactors whose endpoints share ≥ 80% of symbol
    /// names with static-analysis evidence.
    pub async fn annotate_refactors(&self) -> Result<i64> {
        let pairs = self
            .client
            .execute_values(
                "MATCH (a:File)-[rel:REFACTORED_TO]->(b:File)
                 OPTIONAL MATCH (sa:Symbol)-[:DEFINED_IN]->(a)
                 WITH a, b, collect(DISTINCT sa.name) AS a_names
                 OPTIONAL MATCH (sb:Symbol)-[:DEFINED_IN]->(b)
                 RETURN {old: a.path, new: b.path, a_names: a_names,
                         b_names: collect(DISTINCT sb.name)} AS value",
                json!({}),
            )
            .await?;

        let mut rows = Vec::new();
        for pair in pairs {
            let a_names = string_set(&pair["a_names"]);
            let b_names = string_set(&pair["b_names"]);
            if symbol_overlap(&a_names, &b_names) >= 0.8 && !a_names.is_empty() {
                rows.push(json!({
                    "old_path": pair["old"],
                    "new_path": pair["new"],
                }));
            }
        }
        let count = rows.len() as i64;
        self.client
            .run_batched(
                "UNWIND $rows AS row
                 MATCH (a:File {path: row.old_path})-[rel:REFACTORED_TO]->(b:File {path: row.new_path})
                 SET rel.sources = CASE
                         WHEN 'static-analysis' IN coalesce(rel.sources, []) THEN rel.sources
                         ELSE coalesce(rel.sources, []) + 'static-analysis'
                     END",
                rows,
            )
            .await?;
        Ok(count)
    }

    async fn commits_with_files(
        &self,
        since_timestamp: Option<&str>,
    ) -> Result<Vec<(String, String, String, Vec<String>)>> {
        let (clause, params) = match since_timestamp {
            Some(since) => ("WHERE c.timestamp >= $since", json!({ "since": since })),
            None => ("", json!({})),
        };
        let cypher = format!(
            "MATCH (c:GitCommit)
             {}
             OPTIONAL MATCH (c)-[:TOUCHED]->(f:File)
             WITH c, collect(f.path) AS files
             RETURN {{hash: c.hash, message: coalesce(c.message, ''),
                      timestamp: coalesce(c.timestamp, ''), files: files}} AS value",
            clause
        );
        let rows = self.client.execute_values(&cypher, params).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let hash = row.get("hash")?.as_str()?.to_string();
                let message = row.get("message")?.as_str().unwrap_or("").to_string();
                let timestamp = row.get("timestamp")?.as_str().unwrap_or("").to_string();
                let files = row
                    .get("files")?
                    .as_array()?
                    .iter()
                    .filter_map(|f| f.as_str().map(String::from))
                    .collect();
                Some((hash, message, timestamp, files))
            })
            .collect())
    }

    async fn code_file_paths(&self) -> Result<Vec<String>> {
        let rows = self
            .client
            .execute_values(
                "MATCH (f:File) WHERE coalesce(f.is_code, false)
                 RETURN f.path AS value ORDER BY f.path",
                json!({}),
            )
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect())
    }
}

/// `(test_path, target_path)` pairs where the target basename is unique in
/// the repository.
fn colocation_pairs(paths: &[String]) -> Vec<(String, String)> {
    use std::collections::HashMap;

    let mut by_basename: HashMap<&str, Vec<&String>> = HashMap::new();
    for path in paths {
        let name = path.rsplit('/').next().unwrap_or(path);
        by_basename.entry(name).or_default().push(path);
    }

    let mut pairs = Vec::new();
    for path in paths {
        let Some(target_name) = test_colocation_target(path) else {
            continue;
        };
        let Some(candidates) = by_basename.get(target_name.as_str()) else {
            continue;
        };
        if candidates.len() == 1 {
            pairs.push((path.clone(), candidates[0].clone()));
        }
    }
    pairs.sort();
    pairs
}

fn string_set(value: &Value) -> std::collections::HashSet<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Jaccard-style overlap: shared names over the smaller set.
fn symbol_overlap(
    a: &std::collections::HashSet<String>,
    b: &std::collections::HashSet<String>,
) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    shared as f64 / a.len().min(b.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_colocation_pairs() {
        let paths = vec![
            "tests/test_chunkers.py".to_string(),
            "devgraph/chunkers.py".to_string(),
            "tests/test_missing.py".to_string(),
        ];
        let pairs = colocation_pairs(&paths);
        assert_eq!(
            pairs,
            vec![(
                "tests/test_chunkers.py".to_string(),
                "devgraph/chunkers.py".to_string()
            )]
        );
    }

    #[test]
    fn test_colocation_requires_unique_target() {
        let paths = vec![
            "tests/test_util.py".to_string(),
            "a/util.py".to_string(),
            "b/util.py".to_string(),
        ];
        assert!(colocation_pairs(&paths).is_empty());
    }

    #[test]
    fn test_symbol_overlap() {
        let a: std::collections::HashSet<String> =
            ["f", "g", "h"].iter().map(|s| s.to_string()).collect();
        let b: std::collections::HashSet<String> =
            ["f", "g", "h", "extra"].iter().map(|s| s.to_string()).collect();
        assert!(symbol_overlap(&a, &b) >= 0.99);

        let c: std::collections::HashSet<String> = ["x"].iter().map(|s| s.to_string()).collect();
        assert_eq!(symbol_overlap(&a, &c), 0.0);
        assert_eq!(symbol_overlap(&a, &Default::default()), 0.0);
    }

    #[test]
    fn test_implements_cypher_uses_noisy_or() {
        let cypher = implements_cypher();
        assert!(cypher.contains("1 - (1 - coalesce(rel.confidence, 0.0)) * (1 - row.confidence)"));
        assert!(cypher.contains("rel.sources"));
    }
}
