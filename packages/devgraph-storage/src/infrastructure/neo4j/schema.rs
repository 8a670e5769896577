//! Idempotent schema DDL: constraints, b-tree indexes, full-text indexes,
//! and the chunk vector index.

use serde_json::json;
use tracing::{info, warn};

use crate::error::Result;

use super::GraphClient;

/// What `apply` actually created or downgraded.
#[derive(Debug, Clone, Default)]
pub struct SchemaReport {
    pub statements_applied: usize,
    pub vector_index_available: bool,
    /// Set when the vector index could not be created and a scalar index
    /// was used instead.
    pub vector_index_downgraded: bool,
}

const CONSTRAINTS: &[&str] = &[
    "CREATE CONSTRAINT IF NOT EXISTS FOR (c:GitCommit) REQUIRE c.hash IS UNIQUE",
    "CREATE CONSTRAINT IF NOT EXISTS FOR (f:File) REQUIRE f.path IS UNIQUE",
    "CREATE CONSTRAINT IF NOT EXISTS FOR (r:Requirement) REQUIRE r.id IS UNIQUE",
    "CREATE CONSTRAINT IF NOT EXISTS FOR (ch:Chunk) REQUIRE ch.id IS UNIQUE",
    "CREATE CONSTRAINT IF NOT EXISTS FOR (d:Document) REQUIRE d.path IS UNIQUE",
    "CREATE CONSTRAINT IF NOT EXISTS FOR (s:Sprint) REQUIRE s.number IS UNIQUE",
    "CREATE CONSTRAINT IF NOT EXISTS FOR (dir:Directory) REQUIRE dir.path IS UNIQUE",
    "CREATE CONSTRAINT IF NOT EXISTS FOR (sym:Symbol) REQUIRE sym.symbol_id IS UNIQUE",
    "CREATE CONSTRAINT IF NOT EXISTS FOR (lib:Library) REQUIRE lib.name IS UNIQUE",
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS FOR (c:GitCommit) ON (c.timestamp)",
    "CREATE INDEX IF NOT EXISTS FOR (f:File) ON (f.path)",
    "CREATE INDEX IF NOT EXISTS FOR (r:Requirement) ON (r.id)",
    "CREATE INDEX IF NOT EXISTS FOR (ch:Chunk) ON (ch.id)",
    "CREATE INDEX IF NOT EXISTS FOR (d:Document) ON (d.path)",
    "CREATE INDEX IF NOT EXISTS FOR (s:Sprint) ON (s.number)",
    "CREATE INDEX IF NOT EXISTS FOR (dir:Directory) ON (dir.path)",
    "CREATE INDEX IF NOT EXISTS FOR (dir:Directory) ON (dir.depth)",
    "CREATE INDEX IF NOT EXISTS FOR ()-[r:TOUCHED]-() ON (r.timestamp)",
    "CREATE INDEX IF NOT EXISTS FOR ()-[r:NEXT_COMMIT]-() ON (r.timestamp)",
    "CREATE INDEX IF NOT EXISTS FOR ()-[r:PREV_COMMIT]-() ON (r.timestamp)",
    "CREATE INDEX IF NOT EXISTS FOR ()-[r:IMPLEMENTS]-() ON (r.timestamp)",
    "CREATE INDEX IF NOT EXISTS FOR ()-[r:EVOLVES_FROM]-() ON (r.timestamp)",
    "CREATE INDEX IF NOT EXISTS FOR ()-[r:REFACTORED_TO]-() ON (r.timestamp)",
    "CREATE INDEX IF NOT EXISTS FOR ()-[r:DEPRECATED_BY]-() ON (r.timestamp)",
    "CREATE INDEX IF NOT EXISTS FOR ()-[r:LINKS_TO]-() ON (r.timestamp)",
];

const FULLTEXT_INDEXES: &[&str] = &[
    "CREATE FULLTEXT INDEX file_fulltext IF NOT EXISTS FOR (f:File) ON EACH [f.path]",
    "CREATE FULLTEXT INDEX requirement_fulltext IF NOT EXISTS FOR (r:Requirement) ON EACH [r.id, r.title]",
    "CREATE FULLTEXT INDEX commit_fulltext IF NOT EXISTS FOR (c:GitCommit) ON EACH [c.message, c.author]",
    "CREATE FULLTEXT INDEX chunk_fulltext IF NOT EXISTS FOR (ch:Chunk) ON EACH [ch.text]",
    "CREATE FULLTEXT INDEX document_fulltext IF NOT EXISTS FOR (d:Document) ON EACH [d.path, d.title]",
];

const VECTOR_INDEX: &str = "\
CREATE VECTOR INDEX chunk_vec_idx IF NOT EXISTS
FOR (ch:Chunk) ON (ch.embedding)
OPTIONS {indexConfig: {
    `vector.dimensions`: 512,
    `vector.similarity_function`: 'cosine'
}}";

const VECTOR_FALLBACK: &str = "CREATE INDEX IF NOT EXISTS FOR (ch:Chunk) ON (ch.embedding)";

/// Declares the schema before each full ingest and at startup. Every
/// statement is `IF NOT EXISTS`, so re-applying is a no-op.
pub struct SchemaManager<'a> {
    client: &'a GraphClient,
}

impl<'a> SchemaManager<'a> {
    pub fn new(client: &'a GraphClient) -> Self {
        Self { client }
    }

    pub async fn apply(&self) -> Result<SchemaReport> {
        let mut report = SchemaReport::default();

        for statement in CONSTRAINTS.iter().chain(INDEXES.iter()) {
            self.client.run(statement, json!({})).await?;
            report.statements_applied += 1;
        }

        for statement in FULLTEXT_INDEXES {
            // Older server versions lack full-text DDL; non-fatal.
            if let Err(e) = self.client.run(statement, json!({})).await {
                warn!("full-text index skipped: {}", e);
            } else {
                report.statements_applied += 1;
            }
        }

        match self.client.run(VECTOR_INDEX, json!({})).await {
            Ok(()) => {
                report.vector_index_available = true;
                report.statements_applied += 1;
            }
            Err(e) => {
                warn!("vector index unsupported, downgrading to scalar: {}", e);
                report.vector_index_downgraded = true;
                if let Err(e) = self.client.run(VECTOR_FALLBACK, json!({})).await {
                    warn!("scalar embedding index also failed: {}", e);
                }
            }
        }

        info!(
            "schema applied: {} statements, vector index {}",
            report.statements_applied,
            if report.vector_index_available {
                "available"
            } else {
                "downgraded"
            }
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_node_label_has_a_constraint() {
        for label in [
            "GitCommit",
            "File",
            "Requirement",
            "Chunk",
            "Document",
            "Sprint",
            "Directory",
            "Symbol",
            "Library",
        ] {
            assert!(
                CONSTRAINTS.iter().any(|c| c.contains(&format!(":{}", label))),
                "missing constraint for {}",
                label
            );
        }
    }

    #[test]
    fn test_every_temporal_edge_has_a_timestamp_index() {
        for kind in devgraph_core::shared::models::EdgeKind::temporal_kinds() {
            assert!(
                INDEXES
                    .iter()
                    .any(|i| i.contains(&format!("[r:{}]", kind.as_str()))),
                "missing timestamp index for {}",
                kind
            );
        }
    }

    #[test]
    fn test_no_legacy_commit_label() {
        for statement in CONSTRAINTS.iter().chain(INDEXES.iter()) {
            assert!(!statement.contains("(c:Commit)"), "legacy Commit label in {}", statement);
        }
    }

    #[test]
    fn test_vector_index_dimensions() {
        assert!(VECTOR_INDEX.contains("512"));
        assert!(VECTOR_INDEX.contains("cosine"));
    }
}
