//! Post-chunking cleanup: superseded chunks whose file vanished, orphan
//! documents, and edgeless files (full profile only).

use serde_json::json;
use tracing::info;

use crate::error::Result;
use crate::infrastructure::neo4j::GraphClient;

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CleanupStats {
    pub chunks_removed: i64,
    pub documents_removed: i64,
    pub files_removed: i64,
}

pub struct CleanupPass<'a> {
    client: &'a GraphClient,
}

impl<'a> CleanupPass<'a> {
    pub fn new(client: &'a GraphClient) -> Self {
        Self { client }
    }

    /// Remove chunks whose file path is no longer present in the working
    /// tree listing provided.
    pub async fn remove_superseded_chunks(&self, live_paths: &[String]) -> Result<i64> {
        self.client
            .execute_count(
                "MATCH (ch:Chunk)
                 WHERE NOT ch.file_path IN $paths
                 DETACH DELETE ch
                 RETURN count(ch) AS value",
                json!({ "paths": live_paths }),
            )
            .await
    }

    /// Remove documents that no longer contain any chunk.
    pub async fn remove_orphan_documents(&self) -> Result<i64> {
        self.client
            .execute_count(
                "MATCH (d:Document)
                 WHERE NOT (d)-[:CONTAINS_CHUNK]->(:Chunk)
                 DETACH DELETE d
                 RETURN count(d) AS value",
                json!({}),
            )
            .await
    }

    /// Remove File nodes with no remaining edges (full profile only).
    pub async fn remove_edgeless_files(&self) -> Result<i64> {
        self.client
            .execute_count(
                "MATCH (f:File)
                 WHERE NOT (f)--()
                 DELETE f
                 RETURN count(f) AS value",
                json!({}),
            )
            .await
    }

    pub async fn run_full(&self, live_paths: &[String]) -> Result<CleanupStats> {
        let stats = CleanupStats {
            chunks_removed: self.remove_superseded_chunks(live_paths).await?,
            documents_removed: self.remove_orphan_documents().await?,
            files_removed: self.remove_edgeless_files().await?,
        };
        info!(
            "cleanup: {} chunks, {} documents, {} files removed",
            stats.chunks_removed, stats.documents_removed, stats.files_removed
        );
        Ok(stats)
    }
}
