//! Stage 7: chunk embeddings, optional. Service failures are soft; every
//! chunk still receives a deterministic fallback vector.

use std::time::Instant;

use serde_json::{json, Value};
use tracing::info;

use devgraph_core::config::RepoConfig;
use devgraph_core::features::embedding::EmbeddingClient;
use devgraph_storage::infrastructure::neo4j::writers::ChunkWriter;

use crate::error::Result;
use crate::pipeline::StageContext;

/// Chunks fetched per round.
const FETCH_LIMIT: usize = 1000;

pub async fn run(ctx: &StageContext, enabled: bool) -> Result<Value> {
    ctx.token.check()?;
    let started = Instant::now();

    if !enabled {
        return Ok(json!({ "skipped": true, "reason": "embeddings disabled" }));
    }

    let config = RepoConfig::from_env();
    let client = EmbeddingClient::new(&config.ml_service_url)?;
    let writer = ChunkWriter::new(&ctx.client);

    let mut embedded = 0usize;
    loop {
        ctx.token.check()?;
        let pending = writer.chunks_without_embeddings(FETCH_LIMIT).await?;
        if pending.is_empty() {
            break;
        }

        for batch in pending.chunks(config.embed_batch_size.max(1)) {
            ctx.token.check()?;
            let texts: Vec<String> = batch
                .iter()
                .map(|(_, text)| truncate_text(text, 2000))
                .collect();
            let vectors = client.embed(&texts).await;
            let rows: Vec<(String, Vec<f32>)> = batch
                .iter()
                .map(|(id, _)| id.clone())
                .zip(vectors)
                .collect();
            embedded += writer.store_embeddings(rows).await?;
        }

        if pending.len() < FETCH_LIMIT {
            break;
        }
    }

    info!("embeddings stage: {} chunks embedded", embedded);
    Ok(json!({
        "chunks_embedded": embedded,
        "duration": started.elapsed().as_secs_f64(),
    }))
}

/// Cap very long chunk texts before sending them to the vectorizer.
fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        let long = "x".repeat(50);
        let cut = truncate_text(&long, 10);
        assert_eq!(cut.len(), 13);
        assert!(cut.ends_with("..."));
    }
}
