//! Code symbol extraction: a true AST walk for Python (tree-sitter) and a
//! regex grammar subset for TS/JS, plus library-usage mapping.

pub mod domain;
pub mod infrastructure;

pub use domain::{PyImport, SymbolKind, SymbolRecord};
pub use infrastructure::{
    extract_python_file, extract_typescript_symbols, map_library, symbol_content_hash,
    PythonExtraction,
};
