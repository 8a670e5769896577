//! Repository configuration: environment lookups, extension tables, and
//! file discovery.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

/// Document extensions chunked as prose.
pub const DOC_EXTENSIONS: &[&str] = &["md", "rst", "txt", "adoc"];

/// Code extensions chunked and parsed for symbols/imports.
pub const CODE_EXTENSIONS: &[&str] = &["py", "ts", "tsx", "js", "jsx"];

/// Files larger than this are skipped by chunking and symbol extraction.
pub const MAX_PARSE_BYTES: u64 = 1024 * 1024;

/// Map an extension to the language name used on File/Symbol nodes.
pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "py" => Some("python"),
        "ts" | "tsx" => Some("typescript"),
        "js" | "jsx" => Some("javascript"),
        _ => None,
    }
}

pub fn is_doc_extension(ext: &str) -> bool {
    DOC_EXTENSIONS.contains(&ext)
}

pub fn is_code_extension(ext: &str) -> bool {
    CODE_EXTENSIONS.contains(&ext)
}

/// Runtime configuration resolved from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    pub repo_path: PathBuf,
    pub ml_service_url: String,
    pub embed_batch_size: usize,
}

impl RepoConfig {
    pub fn from_env() -> Self {
        let repo_path = std::env::var("REPO_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let ml_service_url = std::env::var("ML_SERVICE_URL")
            .unwrap_or_else(|_| "http://localhost:8001".to_string());
        let embed_batch_size = std::env::var("EMBED_BATCH_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);
        Self {
            repo_path,
            ml_service_url,
            embed_batch_size,
        }
    }

    pub fn with_repo_path(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
            ml_service_url: "http://localhost:8001".to_string(),
            embed_batch_size: 10,
        }
    }
}

/// A discovered file with its repo-relative POSIX path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredFile {
    pub path: String,
    pub extension: String,
    pub is_doc: bool,
    pub is_code: bool,
    pub size_bytes: u64,
}

/// Walk the working tree and classify files by the extension tables.
///
/// Hidden directories and common build/dependency directories are skipped.
/// When `subpath` is set only files under that repo-relative prefix are
/// returned. Results are sorted by path for determinism.
pub fn discover_files(repo_root: &Path, subpath: Option<&str>) -> Vec<DiscoveredFile> {
    let mut files = Vec::new();

    for entry in WalkDir::new(repo_root)
        .into_iter()
        .filter_entry(|e| !is_ignored_dir(e.path()))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let rel = match entry.path().strip_prefix(repo_root) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let rel_posix = to_posix(rel);
        if let Some(prefix) = subpath {
            let prefix = prefix.trim_matches('/');
            if !(rel_posix == prefix || rel_posix.starts_with(&format!("{}/", prefix))) {
                continue;
            }
        }
        let extension = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        let is_doc = is_doc_extension(&extension);
        let is_code = is_code_extension(&extension);
        if !is_doc && !is_code {
            continue;
        }
        let size_bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);
        files.push(DiscoveredFile {
            path: rel_posix,
            extension,
            is_doc,
            is_code,
            size_bytes,
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    files
}

fn is_ignored_dir(path: &Path) -> bool {
    if !path.is_dir() {
        return false;
    }
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => {
            name.starts_with('.')
                || matches!(
                    name,
                    "node_modules" | "target" | "__pycache__" | "venv" | "dist" | "build"
                )
        }
        None => false,
    }
}

pub fn to_posix(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_tables_are_disjoint() {
        for ext in DOC_EXTENSIONS {
            assert!(!is_code_extension(ext));
        }
        for ext in CODE_EXTENSIONS {
            assert!(!is_doc_extension(ext));
        }
    }

    #[test]
    fn test_language_for_extension() {
        assert_eq!(language_for_extension("py"), Some("python"));
        assert_eq!(language_for_extension("tsx"), Some("typescript"));
        assert_eq!(language_for_extension("jsx"), Some("javascript"));
        assert_eq!(language_for_extension("rs"), None);
    }

    #[test]
    fn test_discover_files_classifies_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/dep")).unwrap();
        std::fs::write(dir.path().join("docs/guide.md"), "# Guide").unwrap();
        std::fs::write(dir.path().join("src/app.py"), "print('x')").unwrap();
        std::fs::write(dir.path().join("src/app.bin"), [0u8, 1, 2]).unwrap();
        std::fs::write(dir.path().join("node_modules/dep/index.js"), "x").unwrap();

        let files = discover_files(dir.path(), None);
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["docs/guide.md", "src/app.py"]);
        assert!(files[0].is_doc && !files[0].is_code);
        assert!(files[1].is_code && !files[1].is_doc);
    }

    #[test]
    fn test_discover_files_subpath() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("docs/guide.md"), "# Guide").unwrap();
        std::fs::write(dir.path().join("src/app.py"), "print('x')").unwrap();

        let files = discover_files(dir.path(), Some("docs"));
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "docs/guide.md");
    }
}
