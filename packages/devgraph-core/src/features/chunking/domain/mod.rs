//! Chunk data model.

use serde::{Deserialize, Serialize};

/// Chunk kind: prose section or code span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Doc,
    Code,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::Doc => "doc",
            ChunkKind::Code => "code",
        }
    }
}

/// A semantic slice of a file.
///
/// ID format: `"<path>#<ordinal>"` for documents (ordinal restarts per
/// file), `"<path>#<start>:<end>"` for code (0-indexed, end-exclusive).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: String,
    pub kind: ChunkKind,
    pub heading: Option<String>,
    pub section: Option<String>,
    pub file_path: String,
    pub span: String,
    pub text: String,
    pub length: usize,
    /// Requirement IDs found in the text, uppercased.
    pub requirements: Vec<String>,
    /// Sprint numbers referenced as `sprint-<n>`.
    pub sprints: Vec<String>,
    pub symbol: Option<String>,
    pub symbol_type: Option<String>,
}

impl ChunkRecord {
    pub fn doc_id(path: &str, ordinal: usize) -> String {
        format!("{}#{}", path, ordinal)
    }

    pub fn code_id(path: &str, start_line: usize, end_line: usize) -> String {
        format!("{}#{}:{}", path, start_line, end_line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_formats() {
        assert_eq!(ChunkRecord::doc_id("docs/a.md", 0), "docs/a.md#0");
        assert_eq!(ChunkRecord::code_id("src/x.py", 3, 17), "src/x.py#3:17");
    }

    #[test]
    fn test_kind_str() {
        assert_eq!(ChunkKind::Doc.as_str(), "doc");
        assert_eq!(ChunkKind::Code.as_str(), "code");
    }
}
