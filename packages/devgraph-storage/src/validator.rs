//! Read-only integrity checks, orphan cleanup, and timestamp backfills.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use tracing::info;

use devgraph_core::shared::models::EdgeKind;

use crate::error::Result;
use crate::infrastructure::neo4j::GraphClient;

pub struct DataValidator<'a> {
    client: &'a GraphClient,
}

impl<'a> DataValidator<'a> {
    pub fn new(client: &'a GraphClient) -> Self {
        Self { client }
    }

    /// Presence of constraints and the vector index.
    pub async fn validate_schema_completeness(&self) -> Result<BTreeMap<String, bool>> {
        let mut checks = BTreeMap::new();

        let constraint_count = self
            .client
            .execute_count("SHOW CONSTRAINTS YIELD name RETURN count(name) AS value", json!({}))
            .await
            .unwrap_or(0);
        checks.insert("constraints_available".to_string(), constraint_count > 0);

        let vector_index = self
            .client
            .execute_count(
                "SHOW INDEXES YIELD name, type
                 WHERE name = 'chunk_vec_idx' AND type = 'VECTOR'
                 RETURN count(name) AS value",
                json!({}),
            )
            .await
            .unwrap_or(0);
        checks.insert("has_vector_index".to_string(), vector_index > 0);

        for (key, label) in [
            ("has_gitcommit", "GitCommit"),
            ("has_file", "File"),
            ("has_requirement", "Requirement"),
            ("has_document", "Document"),
            ("has_chunk", "Chunk"),
            ("has_sprint", "Sprint"),
        ] {
            let count = self
                .client
                .execute_count(
                    &format!("MATCH (n:{}) RETURN count(n) AS value", label),
                    json!({}),
                )
                .await?;
            checks.insert(key.to_string(), count >= 0);
        }

        Ok(checks)
    }

    /// Null-timestamp counts per temporal edge type.
    pub async fn validate_temporal_consistency(&self) -> Result<BTreeMap<String, i64>> {
        let mut out = BTreeMap::new();
        for kind in EdgeKind::temporal_kinds() {
            let count = self
                .client
                .execute_count(
                    &format!(
                        "MATCH ()-[r:{}]->() WHERE r.timestamp IS NULL RETURN count(r) AS value",
                        kind.as_str()
                    ),
                    json!({}),
                )
                .await?;
            out.insert(format!("{}_missing_ts", kind.as_str().to_lowercase()), count);
        }
        Ok(out)
    }

    /// Dangling-edge counts for the structural relationships. An edge is
    /// dangling when an endpoint misses its business key.
    pub async fn validate_relationship_integrity(&self) -> Result<BTreeMap<String, i64>> {
        let mut out = BTreeMap::new();

        let queries = [
            (
                "dangling_implements",
                "MATCH (r)-[rel:IMPLEMENTS]->(f)
                 WHERE (r:Requirement AND r.id IS NULL) OR (f:File AND f.path IS NULL)
                 RETURN count(rel) AS value",
            ),
            (
                "dangling_contains_chunk",
                "MATCH (d:Document)-[rel:CONTAINS_CHUNK]->(ch:Chunk)
                 WHERE d.path IS NULL OR ch.id IS NULL OR ch.file_path <> d.path
                 RETURN count(rel) AS value",
            ),
            (
                "dangling_part_of",
                "MATCH (ch:Chunk)-[rel:PART_OF]->(f:File)
                 WHERE ch.file_path IS NULL OR f.path IS NULL OR ch.file_path <> f.path
                 RETURN count(rel) AS value",
            ),
            (
                "dangling_includes",
                "MATCH (s:Sprint)-[rel:INCLUDES]->(c:GitCommit)
                 WHERE s.number IS NULL OR c.hash IS NULL
                 RETURN count(rel) AS value",
            ),
            (
                "dangling_links_to",
                "MATCH (a:Chunk)-[rel:LINKS_TO]->(b:Chunk)
                 WHERE a.id IS NULL OR b.id IS NULL
                 RETURN count(rel) AS value",
            ),
        ];
        for (key, cypher) in queries {
            out.insert(key.to_string(), self.client.execute_count(cypher, json!({})).await?);
        }
        Ok(out)
    }

    /// Edge groups sharing `(type, start, end)` with more than one member.
    pub async fn detect_duplicate_relationships(&self) -> Result<Vec<Value>> {
        self.client
            .execute_values(
                "MATCH (a)-[r]->(b)
                 WITH type(r) AS t, elementId(a) AS a_id, elementId(b) AS b_id, count(r) AS dup_count
                 WHERE dup_count > 1
                 RETURN {type: t, a_id: a_id, b_id: b_id, dup_count: dup_count} AS value",
                json!({}),
            )
            .await
    }

    /// Delete up to `limit` degree-0 nodes.
    pub async fn cleanup_orphaned_nodes(&self, limit: usize) -> Result<i64> {
        let deleted = self
            .client
            .execute_count(
                "MATCH (n)
                 WHERE NOT (n)--()
                 WITH n LIMIT $limit
                 DELETE n
                 RETURN count(n) AS value",
                json!({ "limit": limit }),
            )
            .await?;
        info!("orphan cleanup removed {} nodes", deleted);
        Ok(deleted)
    }

    /// Backfill missing timestamps from commit provenance; IMPLEMENTS
    /// edges without a commit fall back to the earliest TOUCHED timestamp
    /// on the target file.
    pub async fn backfill_missing_timestamps(&self) -> Result<BTreeMap<String, i64>> {
        let mut results = BTreeMap::new();

        for kind in ["IMPLEMENTS", "EVOLVES_FROM", "REFACTORED_TO", "DEPRECATED_BY"] {
            let count = self
                .client
                .execute_count(
                    &format!(
                        "MATCH ()-[rel:{}]->()
                         WHERE rel.timestamp IS NULL AND rel.commit IS NOT NULL AND rel.commit <> ''
                         MATCH (c:GitCommit {{hash: rel.commit}})
                         SET rel.timestamp = c.timestamp
                         RETURN count(rel) AS value",
                        kind
                    ),
                    json!({}),
                )
                .await?;
            results.insert(format!("{}_from_commit", kind), count);
        }

        let from_file = self
            .client
            .execute_count(
                "MATCH (:Requirement)-[rel:IMPLEMENTS]->(f:File)
                 WHERE rel.timestamp IS NULL AND (rel.commit IS NULL OR rel.commit = '')
                 OPTIONAL MATCH (:GitCommit)-[t:TOUCHED]->(f)
                 WITH rel, min(t.timestamp) AS ts
                 WHERE ts IS NOT NULL
                 SET rel.timestamp = ts
                 RETURN count(rel) AS value",
                json!({}),
            )
            .await?;
        results.insert("IMPLEMENTS_from_file".to_string(), from_file);

        Ok(results)
    }
}
