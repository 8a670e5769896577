//! Mention records produced by the scanner.

use serde::{Deserialize, Serialize};

/// A file mention found in a chunk's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMention {
    pub chunk_id: String,
    pub file_path: String,
    /// The raw term as written in the document.
    pub term: String,
    /// Resolution method: `full-path` or `basename`.
    pub method: String,
    pub confidence: f64,
}

/// A commit mention found in a chunk's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitMention {
    pub chunk_id: String,
    pub commit_hash: String,
    pub term: String,
    pub method: String,
    pub confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_roundtrip() {
        let mention = FileMention {
            chunk_id: "docs/a.md#0".into(),
            file_path: "src/app.py".into(),
            term: "src/app.py".into(),
            method: "full-path".into(),
            confidence: 1.0,
        };
        let json = serde_json::to_string(&mention).unwrap();
        let back: FileMention = serde_json::from_str(&json).unwrap();
        assert_eq!(mention, back);
    }
}
