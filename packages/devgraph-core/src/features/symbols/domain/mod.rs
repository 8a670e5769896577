//! Symbol records emitted by the extractors.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Class,
    Function,
    Method,
    Interface,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Interface => "interface",
        }
    }
}

/// A first-class code symbol.
///
/// `symbol_id = "<file>::<kind>::<qualified_name>"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub symbol_id: String,
    pub name: String,
    pub qualified_name: String,
    pub kind: SymbolKind,
    pub file_path: String,
    pub language: String,
    pub line_number: u32,
    pub signature: String,
    pub parent: Option<String>,
    pub docstring: Option<String>,
    pub doc_preview: Option<String>,
    pub decorators: Vec<String>,
    pub bases: Vec<String>,
    pub interfaces: Vec<String>,
    pub return_type: Option<String>,
    pub is_async: bool,
    pub exported: Option<bool>,
}

impl SymbolRecord {
    pub fn build_id(file_path: &str, kind: SymbolKind, qualified_name: &str) -> String {
        format!("{}::{}::{}", file_path, kind.as_str(), qualified_name)
    }

    pub fn new(
        file_path: &str,
        kind: SymbolKind,
        name: impl Into<String>,
        qualified_name: impl Into<String>,
        language: &str,
        line_number: u32,
    ) -> Self {
        let name = name.into();
        let qualified_name = qualified_name.into();
        Self {
            symbol_id: Self::build_id(file_path, kind, &qualified_name),
            name,
            qualified_name,
            kind,
            file_path: file_path.to_string(),
            language: language.to_string(),
            line_number,
            signature: String::new(),
            parent: None,
            docstring: None,
            doc_preview: None,
            decorators: Vec::new(),
            bases: Vec::new(),
            interfaces: Vec::new(),
            return_type: None,
            is_async: false,
            exported: None,
        }
    }
}

/// Truncate a docstring to its first line, capped at 160 chars.
pub fn doc_preview(text: &str) -> Option<String> {
    let preview = text.trim().lines().next()?.trim();
    if preview.is_empty() {
        return None;
    }
    if preview.len() > 160 {
        let cut: String = preview.chars().take(157).collect();
        Some(format!("{}...", cut))
    } else {
        Some(preview.to_string())
    }
}

/// A Python import statement, as needed by both library mapping and the
/// import graph resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PyImport {
    /// Dotted module (`x.y`); `None` for bare relative imports
    /// (`from . import z`).
    pub module: Option<String>,
    /// Imported names; empty for `import x.y` statements.
    pub names: Vec<String>,
    /// Relative level: number of leading dots in a `from` import.
    pub level: usize,
    pub line: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_id_format() {
        let id = SymbolRecord::build_id("src/app.py", SymbolKind::Method, "App.run");
        assert_eq!(id, "src/app.py::method::App.run");
    }

    #[test]
    fn test_doc_preview() {
        assert_eq!(doc_preview("First line.\nSecond."), Some("First line.".into()));
        assert_eq!(doc_preview("   \n\n"), None);
        let long = "x".repeat(200);
        let preview = doc_preview(&long).unwrap();
        assert_eq!(preview.len(), 160);
        assert!(preview.ends_with("..."));
    }
}
