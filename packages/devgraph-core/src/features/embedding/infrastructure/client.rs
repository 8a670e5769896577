//! HTTP client for the external embedding service.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CoreError, Result};

use super::fallback::fallback_embeddings;
use super::EMBEDDING_DIMS;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Client for `POST /embed_text`. Service failures are soft: the caller
/// always receives vectors, falling back to deterministic hash-based ones.
pub struct EmbeddingClient {
    http: reqwest::Client,
    base_url: String,
}

impl EmbeddingClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CoreError::Embedding(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// Embed a batch of texts. Returns one 512-dim vector per input.
    pub async fn embed(&self, texts: &[String]) -> Vec<Vec<f32>> {
        if texts.is_empty() {
            return Vec::new();
        }
        match self.embed_remote(texts).await {
            Ok(embeddings) => embeddings,
            Err(e) => {
                warn!("embedding service unavailable: {}", e);
                info!("using fallback hash-based embeddings for {} texts", texts.len());
                fallback_embeddings(texts)
            }
        }
    }

    async fn embed_remote(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embed_text", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .json(&EmbedRequest { texts })
            .send()
            .await
            .map_err(|e| CoreError::Embedding(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CoreError::Embedding(format!(
                "embed_text returned {}",
                response.status()
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| CoreError::Embedding(e.to_string()))?;

        if body.embeddings.len() != texts.len()
            || body.embeddings.iter().any(|v| v.len() != EMBEDDING_DIMS)
        {
            return Err(CoreError::Embedding(format!(
                "expected {} vectors of {} dims",
                texts.len(),
                EMBEDDING_DIMS
            )));
        }

        Ok(body.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_service_falls_back() {
        // Nothing listens on this port; the client must still return
        // deterministic vectors.
        let client = EmbeddingClient::new("http://127.0.0.1:59999").unwrap();
        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let vectors = client.embed(&texts).await;
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), EMBEDDING_DIMS);
        assert_eq!(vectors, client.embed(&texts).await);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let client = EmbeddingClient::new("http://127.0.0.1:59999").unwrap();
        assert!(client.embed(&[]).await.is_empty());
    }
}
