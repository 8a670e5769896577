//! Deterministic hash-based fallback vectors.

use sha2::{Digest, Sha256};

use super::EMBEDDING_DIMS;

/// Derive a 512-dim vector from the text's SHA-256 digest. The digest is
/// re-hashed until enough bytes accumulate; every 4 bytes become one
/// component normalized into [0, 1). Deterministic, so repeated ingests
/// produce identical vectors.
pub fn fallback_embedding(text: &str) -> Vec<f32> {
    let mut embedding = Vec::with_capacity(EMBEDDING_DIMS);
    let mut digest = Sha256::digest(text.as_bytes());

    while embedding.len() < EMBEDDING_DIMS {
        for chunk in digest.chunks_exact(4) {
            if embedding.len() >= EMBEDDING_DIMS {
                break;
            }
            let raw = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            embedding.push(raw as f32 / u32::MAX as f32);
        }
        digest = Sha256::digest(digest);
    }

    embedding
}

pub fn fallback_embeddings(texts: &[String]) -> Vec<Vec<f32>> {
    texts.iter().map(|t| fallback_embedding(t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_and_range() {
        let v = fallback_embedding("some chunk text");
        assert_eq!(v.len(), EMBEDDING_DIMS);
        assert!(v.iter().all(|x| (0.0..=1.0).contains(x)));
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(fallback_embedding("abc"), fallback_embedding("abc"));
        assert_ne!(fallback_embedding("abc"), fallback_embedding("abd"));
    }

    #[test]
    fn test_empty_text() {
        let v = fallback_embedding("");
        assert_eq!(v.len(), EMBEDDING_DIMS);
    }
}
