//! Chunk persistence. Replacing a file's chunks is transactional:
//! delete-then-insert in one write transaction so a chunk never coexists
//! with its predecessor.

use serde_json::{json, Value};
use tracing::debug;

use devgraph_core::config::{is_code_extension, is_doc_extension, language_for_extension};
use devgraph_core::features::chunking::ChunkRecord;

use crate::error::Result;
use crate::infrastructure::neo4j::GraphClient;

pub struct ChunkWriter<'a> {
    client: &'a GraphClient,
}

impl<'a> ChunkWriter<'a> {
    pub fn new(client: &'a GraphClient) -> Self {
        Self { client }
    }

    /// Replace all chunks of one file. For documents, the Document node and
    /// CONTAINS_CHUNK edges are refreshed as well; every chunk gets its
    /// PART_OF edge and MENTIONS edges for extracted requirement IDs.
    pub async fn replace_file_chunks(&self, file_path: &str, chunks: &[ChunkRecord]) -> Result<usize> {
        let extension = file_path
            .rsplit('.')
            .next()
            .filter(|ext| !ext.contains('/'))
            .unwrap_or("")
            .to_ascii_lowercase();
        let is_doc = is_doc_extension(&extension);
        let title = file_path
            .rsplit('/')
            .next()
            .and_then(|name| name.rsplit_once('.').map(|(stem, _)| stem.to_string()))
            .unwrap_or_else(|| file_path.to_string());

        let mut statements: Vec<(String, Value)> = Vec::new();

        statements.push((
            "MATCH (c:Chunk {file_path: $path}) DETACH DELETE c".to_string(),
            json!({ "path": file_path }),
        ));

        statements.push((
            "MERGE (f:File {path: $path})
             ON CREATE SET f.uid = $path
             SET f.extension = $extension,
                 f.language = $language,
                 f.is_code = $is_code,
                 f.is_doc = $is_doc"
                .to_string(),
            json!({
                "path": file_path,
                "extension": extension,
                "language": language_for_extension(&extension),
                "is_code": is_code_extension(&extension),
                "is_doc": is_doc,
            }),
        ));

        if is_doc {
            statements.push((
                "MERGE (d:Document {path: $path})
                 ON CREATE SET d.uid = $path
                 SET d.title = $title, d.type = $doc_type"
                    .to_string(),
                json!({ "path": file_path, "title": title, "doc_type": "markdown" }),
            ));
        }

        if !chunks.is_empty() {
            statements.push((
                "UNWIND $rows AS row
                 MATCH (f:File {path: row.file_path})
                 MERGE (ch:Chunk {id: row.id})
                 SET ch.kind = row.kind,
                     ch.heading = row.heading,
                     ch.section = row.section,
                     ch.file_path = row.file_path,
                     ch.span = row.span,
                     ch.text = row.text,
                     ch.length = row.length,
                     ch.symbol = row.symbol,
                     ch.symbol_type = row.symbol_type,
                     ch.uid = row.id
                 MERGE (ch)-[:PART_OF]->(f)"
                    .to_string(),
                json!({ "rows": build_chunk_rows(chunks) }),
            ));

            if is_doc {
                statements.push((
                    "UNWIND $rows AS row
                     MATCH (d:Document {path: row.file_path})
                     MATCH (ch:Chunk {id: row.id})
                     MERGE (d)-[:CONTAINS_CHUNK]->(ch)"
                        .to_string(),
                    json!({ "rows": build_chunk_rows(chunks) }),
                ));
            }

            let mention_rows = build_mention_rows(chunks);
            if !mention_rows.is_empty() {
                statements.push((
                    "UNWIND $rows AS row
                     MATCH (ch:Chunk {id: row.chunk_id})
                     MERGE (r:Requirement {id: row.requirement_id})
                     ON CREATE SET r.uid = row.requirement_id
                     MERGE (ch)-[:MENTIONS]->(r)"
                        .to_string(),
                    json!({ "rows": mention_rows }),
                ));
            }
        }

        self.client.run_in_txn(statements).await?;
        debug!("replaced {} chunks for {}", chunks.len(), file_path);
        Ok(chunks.len())
    }

    /// Store embeddings for chunks by id.
    pub async fn store_embeddings(&self, embeddings: Vec<(String, Vec<f32>)>) -> Result<usize> {
        let rows: Vec<Value> = embeddings
            .into_iter()
            .map(|(chunk_id, vector)| json!({ "chunk_id": chunk_id, "embedding": vector }))
            .collect();
        self.client
            .run_batched(
                "UNWIND $rows AS row
                 MATCH (ch:Chunk {id: row.chunk_id})
                 SET ch.embedding = row.embedding",
                rows,
            )
            .await
    }

    /// Chunk ids still lacking an embedding, with text, oldest first.
    pub async fn chunks_without_embeddings(&self, limit: usize) -> Result<Vec<(String, String)>> {
        let rows = self
            .client
            .execute_values(
                "MATCH (ch:Chunk)
                 WHERE ch.embedding IS NULL AND ch.text IS NOT NULL
                 RETURN {id: ch.id, text: ch.text} AS value
                 ORDER BY value.id
                 LIMIT $limit",
                json!({ "limit": limit }),
            )
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.get("id")?.as_str()?.to_string();
                let text = row.get("text")?.as_str()?.to_string();
                Some((id, text))
            })
            .collect())
    }
}

fn build_chunk_rows(chunks: &[ChunkRecord]) -> Vec<Value> {
    chunks
        .iter()
        .map(|chunk| {
            json!({
                "id": chunk.id,
                "kind": chunk.kind.as_str(),
                "heading": chunk.heading,
                "section": chunk.section,
                "file_path": chunk.file_path,
                "span": chunk.span,
                "text": chunk.text,
                "length": chunk.length,
                "symbol": chunk.symbol,
                "symbol_type": chunk.symbol_type,
            })
        })
        .collect()
}

fn build_mention_rows(chunks: &[ChunkRecord]) -> Vec<Value> {
    let mut rows = Vec::new();
    for chunk in chunks {
        for requirement_id in &chunk.requirements {
            rows.push(json!({ "chunk_id": chunk.id, "requirement_id": requirement_id }));
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use devgraph_core::features::chunking::ChunkKind;

    fn doc_chunk(id: &str, requirements: Vec<&str>) -> ChunkRecord {
        ChunkRecord {
            id: id.to_string(),
            kind: ChunkKind::Doc,
            heading: Some("Overview".into()),
            section: Some("Overview".into()),
            file_path: "docs/a.md".into(),
            span: "1:10".into(),
            text: "body".into(),
            length: 4,
            requirements: requirements.into_iter().map(String::from).collect(),
            sprints: vec![],
            symbol: None,
            symbol_type: None,
        }
    }

    #[test]
    fn test_chunk_rows_shape() {
        let rows = build_chunk_rows(&[doc_chunk("docs/a.md#0", vec![])]);
        assert_eq!(rows[0]["id"], "docs/a.md#0");
        assert_eq!(rows[0]["kind"], "doc");
        assert_eq!(rows[0]["span"], "1:10");
        assert_eq!(rows[0]["symbol"], Value::Null);
    }

    #[test]
    fn test_mention_rows() {
        let rows = build_mention_rows(&[
            doc_chunk("docs/a.md#0", vec!["FR-01-02", "NFR-02-03"]),
            doc_chunk("docs/a.md#1", vec![]),
        ]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["chunk_id"], "docs/a.md#0");
        assert_eq!(rows[1]["requirement_id"], "NFR-02-03");
    }
}
