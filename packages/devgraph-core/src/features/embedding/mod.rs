//! Chunk embeddings: optional external vectorizer with a deterministic
//! hash-based fallback.

pub mod infrastructure;

pub use infrastructure::{fallback_embedding, fallback_embeddings, EmbeddingClient, EMBEDDING_DIMS};
