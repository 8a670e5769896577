mod libraries;
mod python;
mod typescript;

pub use libraries::{doc_library_terms, map_library};
pub use python::{extract_python_file, PythonExtraction};
pub use typescript::{extract_ts_imports, extract_typescript_symbols};

use sha1::{Digest, Sha1};

/// SHA-1 over a code file's raw bytes; used to short-circuit re-parsing.
pub fn symbol_content_hash(content: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_content_hash_is_stable() {
        let a = symbol_content_hash(b"def f(): pass\n");
        let b = symbol_content_hash(b"def f(): pass\n");
        assert_eq!(a, b);
        assert_eq!(a.len(), 40);
        assert_ne!(a, symbol_content_hash(b"def g(): pass\n"));
    }
}
