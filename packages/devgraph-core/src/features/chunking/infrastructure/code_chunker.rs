//! Code chunking by function/class boundaries with sliding-window gap
//! fill.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::features::chunking::domain::{ChunkKind, ChunkRecord};
use crate::shared::models::Span;

use super::{extract_requirements, extract_sprints};

// Python definition headers. Methods are distinguished from functions by
// leading indentation.
static PY_FUNCTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^def\s+(\w+)\s*\(").unwrap());
static PY_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^class\s+(\w+)").unwrap());
static PY_METHOD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]+def\s+(\w+)\s*\(").unwrap());

// TS/JS definition headers, including default exports and arrow consts.
static TS_FUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s+(\w+)\s*\(").unwrap());
static TS_ARROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(?:export\s+)?const\s+(\w+)\s*=\s*(?:async\s+)?\([^)]*\)\s*=>").unwrap());
static TS_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^(?:export\s+)?class\s+(\w+)").unwrap());
static TS_INTERFACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(?:export\s+)?interface\s+(\w+)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Language {
    Python,
    TsJs,
    Unknown,
}

fn detect_language(file_path: &str) -> Language {
    let ext = file_path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "py" => Language::Python,
        "ts" | "tsx" | "js" | "jsx" => Language::TsJs,
        _ => Language::Unknown,
    }
}

/// Chunks code files by definitions, filling uncovered regions with
/// sliding windows that snap to blank/comment boundaries.
pub struct CodeChunker {
    min_chunk_length: usize,
    max_chunk_length: usize,
    overlap_lines: usize,
}

impl Default for CodeChunker {
    fn default() -> Self {
        Self {
            min_chunk_length: 50,
            max_chunk_length: 2000,
            overlap_lines: 20,
        }
    }
}

impl CodeChunker {
    pub fn new(min_chunk_length: usize, max_chunk_length: usize, overlap_lines: usize) -> Self {
        Self {
            min_chunk_length,
            max_chunk_length,
            overlap_lines,
        }
    }

    pub fn chunk_file(&self, file_path: &str, content: &str) -> Vec<ChunkRecord> {
        let language = detect_language(file_path);
        let lines: Vec<&str> = content.split('\n').collect();

        let mut chunks = Vec::new();
        let mut covered: HashSet<usize> = HashSet::new();

        if language != Language::Unknown {
            let function_chunks = self.chunk_by_definitions(file_path, content, &lines, language);
            for chunk in &function_chunks {
                if let Some(span) = Span::parse(&chunk.span) {
                    covered.extend(span.start_line as usize..span.end_line as usize);
                }
            }
            chunks.extend(function_chunks);
        }

        chunks.extend(self.chunk_sliding_window(file_path, &lines, &covered));
        chunks
    }

    fn chunk_by_definitions(
        &self,
        file_path: &str,
        content: &str,
        lines: &[&str],
        language: Language,
    ) -> Vec<ChunkRecord> {
        let patterns: Vec<(&Regex, &str)> = match language {
            Language::Python => vec![
                (&PY_FUNCTION, "function"),
                (&PY_CLASS, "class"),
                (&PY_METHOD, "method"),
            ],
            Language::TsJs => vec![
                (&TS_FUNCTION, "function"),
                (&TS_ARROW, "function"),
                (&TS_CLASS, "class"),
                (&TS_INTERFACE, "interface"),
            ],
            Language::Unknown => Vec::new(),
        };

        let mut matches: Vec<(usize, String, &str)> = Vec::new();
        for (pattern, kind) in patterns {
            for m in pattern.find_iter(content) {
                let header = m.as_str().trim().to_string();
                matches.push((m.start(), header, kind));
            }
        }
        matches.sort_by_key(|(start, _, _)| *start);

        let mut chunks = Vec::new();
        let mut seen_spans = HashSet::new();
        for (start_byte, header, kind) in matches {
            let start_line = content[..start_byte].matches('\n').count();
            let end_line = match language {
                Language::Python => find_python_end(lines, start_line),
                _ => find_brace_end(lines, start_line),
            };
            if end_line <= start_line || !seen_spans.insert((start_line, end_line)) {
                continue;
            }

            let text = lines[start_line..end_line].join("\n");
            if text.len() < self.min_chunk_length {
                continue;
            }

            chunks.push(self.make_chunk(
                file_path,
                start_line,
                end_line,
                text,
                Some(header.clone()),
                Some(kind.to_string()),
                Some(header),
                Some(kind.to_string()),
            ));
        }
        chunks
    }

    fn chunk_sliding_window(
        &self,
        file_path: &str,
        lines: &[&str],
        covered: &HashSet<usize>,
    ) -> Vec<ChunkRecord> {
        // Window size derived from the character budget, ~50 chars/line.
        let max_lines = (self.max_chunk_length / 50).max(1).min(lines.len().max(1));
        let mut chunks = Vec::new();
        let mut i = 0usize;

        while i < lines.len() {
            if covered.contains(&i) {
                i += 1;
                continue;
            }

            let mut end = (i + max_lines).min(lines.len());
            // Snap to a natural boundary: blank line or comment start.
            for j in ((i + 2)..end).rev() {
                let line = lines[j].trim();
                if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                    end = j + 1;
                    break;
                }
            }

            let text = lines[i..end].join("\n");
            if text.trim().len() >= self.min_chunk_length {
                chunks.push(self.make_chunk(
                    file_path,
                    i,
                    end,
                    text,
                    None,
                    Some("sliding_window".to_string()),
                    None,
                    Some("sliding_window".to_string()),
                ));
            }

            i = (i + 1).max(end.saturating_sub(self.overlap_lines));
        }
        chunks
    }

    #[allow(clippy::too_many_arguments)]
    fn make_chunk(
        &self,
        file_path: &str,
        start_line: usize,
        end_line: usize,
        text: String,
        heading: Option<String>,
        section: Option<String>,
        symbol: Option<String>,
        symbol_type: Option<String>,
    ) -> ChunkRecord {
        let requirements = extract_requirements(&text);
        let sprints = extract_sprints(&text);
        let length = text.len();
        ChunkRecord {
            id: ChunkRecord::code_id(file_path, start_line, end_line),
            kind: ChunkKind::Code,
            heading,
            section,
            file_path: file_path.to_string(),
            span: format!("{}:{}", start_line, end_line),
            text,
            length,
            requirements,
            sprints,
            symbol,
            symbol_type,
        }
    }
}

/// End of a Python definition: first subsequent non-blank line at or below
/// the defining indent.
fn find_python_end(lines: &[&str], start_line: usize) -> usize {
    if start_line >= lines.len() {
        return start_line;
    }
    let base = lines[start_line];
    let base_indent = base.len() - base.trim_start().len();

    for (i, line) in lines.iter().enumerate().skip(start_line + 1) {
        if line.trim().is_empty() {
            continue;
        }
        let indent = line.len() - line.trim_start().len();
        if indent <= base_indent {
            return i;
        }
    }
    lines.len()
}

/// End of a TS/JS definition by brace matching, end-exclusive.
fn find_brace_end(lines: &[&str], start_line: usize) -> usize {
    let mut depth = 0i32;
    let mut opened = false;

    for (i, line) in lines.iter().enumerate().skip(start_line) {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => {
                    depth -= 1;
                    if opened && depth == 0 {
                        return i + 1;
                    }
                }
                _ => {}
            }
        }
    }
    lines.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_python_function_span() {
        let content = "\
def alpha(x):
    total = x + 1
    return total


def beta(y):
    return y * 2
";
        let chunks = CodeChunker::new(10, 2000, 2).chunk_file("src/app.py", content);
        // Blank lines do not terminate a definition; alpha runs until beta.
        let alpha = chunks.iter().find(|c| c.id == "src/app.py#0:5").unwrap();
        assert_eq!(alpha.symbol_type.as_deref(), Some("function"));
        assert!(alpha.text.contains("total = x + 1"));
        assert!(chunks.iter().any(|c| c.span.starts_with("5:")));
    }

    #[test]
    fn test_python_method_detection() {
        let content = "\
class Service:
    def handle(self, req):
        return req
";
        let chunks = CodeChunker::new(5, 2000, 2).chunk_file("svc.py", content);
        let kinds: Vec<_> = chunks
            .iter()
            .filter_map(|c| c.symbol_type.as_deref())
            .collect();
        assert!(kinds.contains(&"class"));
        assert!(kinds.contains(&"method"));
    }

    #[test]
    fn test_js_brace_end() {
        let content = "\
export function render(props) {
  if (props.done) {
    return null;
  }
  return props.value;
}
";
        let chunks = CodeChunker::new(10, 2000, 2).chunk_file("ui/render.ts", content);
        let func = chunks
            .iter()
            .find(|c| c.symbol_type.as_deref() == Some("function"))
            .unwrap();
        assert_eq!(func.span, "0:6");
    }

    #[test]
    fn test_ts_interface_and_arrow() {
        let content = "\
export interface Props {
  value: string;
  done: boolean;
}

export const format = (value) => {
  return value.trim();
};
";
        let chunks = CodeChunker::new(10, 2000, 2).chunk_file("ui/props.tsx", content);
        let kinds: Vec<_> = chunks
            .iter()
            .filter_map(|c| c.symbol_type.as_deref())
            .collect();
        assert!(kinds.contains(&"interface"));
        assert!(kinds.contains(&"function"));
    }

    #[test]
    fn test_sliding_window_for_unknown_language() {
        let long_line = "let value = compute(input); // keep the window filled".repeat(2);
        let content = vec![long_line.as_str(); 10].join("\n");
        let chunks = CodeChunker::new(10, 200, 1).chunk_file("misc/data.txt", &content);
        assert!(!chunks.is_empty());
        assert!(chunks
            .iter()
            .all(|c| c.symbol_type.as_deref() == Some("sliding_window")));
        // IDs are span-based and unique.
        let ids: HashSet<_> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), chunks.len());
    }

    #[test]
    fn test_chunking_is_idempotent() {
        let content = "\
def alpha(x):
    return x + 1

plain = 1
other = 2
";
        let chunker = CodeChunker::default();
        let a = chunker.chunk_file("m.py", content);
        let b = chunker.chunk_file("m.py", content);
        assert_eq!(a, b);
    }

    #[test]
    fn test_code_ids_are_zero_indexed_end_exclusive() {
        let content = "def f():\n    return 1\n";
        let chunks = CodeChunker::new(5, 2000, 2).chunk_file("f.py", content);
        assert_eq!(chunks[0].id, "f.py#0:2");
    }
}
