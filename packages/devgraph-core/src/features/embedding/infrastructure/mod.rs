mod client;
mod fallback;

pub use client::EmbeddingClient;
pub use fallback::{fallback_embedding, fallback_embeddings};

/// Vector index dimensionality.
pub const EMBEDDING_DIMS: usize = 512;
