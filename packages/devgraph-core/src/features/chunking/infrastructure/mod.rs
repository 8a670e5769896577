mod code_chunker;
mod markdown_chunker;

pub use code_chunker::CodeChunker;
pub use markdown_chunker::MarkdownChunker;

use once_cell::sync::Lazy;
use regex::Regex;

/// Requirement identifiers in chunk text (`FR-01-02`, `NFR-03-01`).
pub(crate) static REQUIREMENT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)((?:FR|NFR)-\d{2}-\d{2})").unwrap());

/// Sprint references (`sprint-11`).
pub(crate) static SPRINT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)sprint-(\d+)").unwrap());

/// Extract uppercased, deduplicated requirement IDs from text.
pub(crate) fn extract_requirements(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for cap in REQUIREMENT_PATTERN.captures_iter(text) {
        let id = cap[1].to_uppercase();
        if seen.insert(id.clone()) {
            out.push(id);
        }
    }
    out
}

pub(crate) fn extract_sprints(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for cap in SPRINT_PATTERN.captures_iter(text) {
        let number = cap[1].to_string();
        if seen.insert(number.clone()) {
            out.push(number);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_requirements() {
        let text = "Implements FR-01-02 and nfr-03-01; FR-01-02 again.";
        assert_eq!(extract_requirements(text), vec!["FR-01-02", "NFR-03-01"]);
    }

    #[test]
    fn test_extract_sprints() {
        let text = "See sprint-11 and Sprint-12 docs.";
        assert_eq!(extract_sprints(text), vec!["11", "12"]);
    }
}
