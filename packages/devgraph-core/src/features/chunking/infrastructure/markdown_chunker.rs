//! Markdown chunking by H2/H3 headings.

use crate::features::chunking::domain::{ChunkKind, ChunkRecord};

use super::{extract_requirements, extract_sprints};

/// Splits Markdown documents into sections for semantic linking.
///
/// A chunk accumulates lines until the next H2/H3 heading; sections shorter
/// than `min_chunk_length` characters are dropped. Ordinals restart per
/// file so chunk IDs are stable across ingests (invariant for idempotent
/// re-ingest).
pub struct MarkdownChunker {
    min_chunk_length: usize,
}

impl Default for MarkdownChunker {
    fn default() -> Self {
        Self {
            min_chunk_length: 50,
        }
    }
}

impl MarkdownChunker {
    pub fn new(min_chunk_length: usize) -> Self {
        Self { min_chunk_length }
    }

    pub fn chunk_document(&self, file_path: &str, content: &str) -> Vec<ChunkRecord> {
        let lines: Vec<&str> = content.split('\n').collect();
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut heading: Option<String> = None;
        let mut section: Option<String> = None;
        let mut ordinal = 0usize;

        for (line_num, line) in lines.iter().enumerate() {
            if line.starts_with("## ") && !line.starts_with("### ") {
                self.flush(
                    file_path, &current, &heading, &section, &mut ordinal, line_num, &mut chunks,
                );
                section = Some(line[3..].trim().to_string());
                heading = section.clone();
                current = vec![line];
            } else if line.starts_with("### ") {
                self.flush(
                    file_path, &current, &heading, &section, &mut ordinal, line_num, &mut chunks,
                );
                heading = Some(line[4..].trim().to_string());
                current = vec![line];
            } else {
                current.push(line);
            }
        }

        self.flush(
            file_path,
            &current,
            &heading,
            &section,
            &mut ordinal,
            lines.len(),
            &mut chunks,
        );
        chunks
    }

    #[allow(clippy::too_many_arguments)]
    fn flush(
        &self,
        file_path: &str,
        lines: &[&str],
        heading: &Option<String>,
        section: &Option<String>,
        ordinal: &mut usize,
        end_line: usize,
        chunks: &mut Vec<ChunkRecord>,
    ) {
        if lines.is_empty() {
            return;
        }
        let text = lines.join("\n").trim().to_string();
        if text.len() < self.min_chunk_length {
            return;
        }

        let requirements = extract_requirements(&text);
        let sprints = extract_sprints(&text);
        let length = text.len();

        chunks.push(ChunkRecord {
            id: ChunkRecord::doc_id(file_path, *ordinal),
            kind: ChunkKind::Doc,
            heading: heading.clone(),
            section: section.clone(),
            file_path: file_path.to_string(),
            span: format!("1:{}", end_line),
            text,
            length,
            requirements,
            sprints,
            symbol: None,
            symbol_type: None,
        });
        *ordinal += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chunker() -> MarkdownChunker {
        MarkdownChunker::default()
    }

    #[test]
    fn test_two_headings_two_chunks() {
        let content = "\
## Overview
This overview section describes what the project is about in detail.

## Details
The details section covers implementation notes and the data layout.";
        let chunks = chunker().chunk_document("docs/plan.md", content);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id, "docs/plan.md#0");
        assert_eq!(chunks[1].id, "docs/plan.md#1");
        assert_eq!(chunks[0].heading.as_deref(), Some("Overview"));
        assert_eq!(chunks[1].section.as_deref(), Some("Details"));
        assert!(chunks.iter().all(|c| c.kind == ChunkKind::Doc));
    }

    #[test]
    fn test_h3_starts_subsection() {
        let content = "\
## Parent
Parent section body that is long enough to be kept as its own chunk here.

### Child
Child subsection body that is also long enough to be kept as a chunk.";
        let chunks = chunker().chunk_document("d.md", content);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].heading.as_deref(), Some("Parent"));
        assert_eq!(chunks[1].heading.as_deref(), Some("Child"));
        // H3 keeps the enclosing H2 section.
        assert_eq!(chunks[1].section.as_deref(), Some("Parent"));
    }

    #[test]
    fn test_short_sections_dropped() {
        let content = "## A\nshort\n## B\nalso short";
        let chunks = chunker().chunk_document("d.md", content);
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_requirement_and_sprint_extraction() {
        let content = "\
## Scope
This sprint-11 work implements FR-01-02 and supersedes NFR-02-03 entirely.";
        let chunks = chunker().chunk_document("d.md", content);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].requirements, vec!["FR-01-02", "NFR-02-03"]);
        assert_eq!(chunks[0].sprints, vec!["11"]);
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let content = "## One\nBody text that is long enough to survive the minimum length gate.";
        let a = chunker().chunk_document("d.md", content);
        let b = chunker().chunk_document("d.md", content);
        assert_eq!(a, b);
    }

    #[test]
    fn test_preamble_before_first_heading_kept() {
        let content = "\
This document opens with an untitled preamble that is long enough to keep.

## First
Body of the first titled section, also long enough to keep around here.";
        let chunks = chunker().chunk_document("d.md", content);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].heading, None);
        assert_eq!(chunks[0].id, "d.md#0");
    }
}
