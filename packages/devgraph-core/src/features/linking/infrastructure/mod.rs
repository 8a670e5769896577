//! Mention scanning over chunk text.

use std::collections::{BTreeSet, HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use sha1::{Digest, Sha1};

use crate::shared::utils::strip_mention_token;

use super::domain::{CommitMention, FileMention};

/// Full relative paths: at least one slash and a short extension.
static FILE_PATH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"((?:[A-Za-z0-9_.-]+/)+[A-Za-z0-9_.-]+\.[A-Za-z0-9]{1,6})").unwrap());

/// Bare file names with a supported extension.
static FILE_BASENAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z0-9_.-]+\.(?:py|tsx|ts|js|jsx|md|json|yml|yaml|css|scss|html|proto|sql))")
        .unwrap()
});

/// Hex tokens that may be commit hashes.
static COMMIT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[0-9a-fA-F]{10,40}\b").unwrap());

const IGNORE_PREFIXES: &[&str] = &["http://", "https://", "www."];

const SUPPORTED_EXTENSIONS: &[&str] = &[
    "py", "tsx", "ts", "js", "jsx", "md", "json", "yml", "yaml", "toml", "ini", "cfg", "css",
    "scss", "html", "proto", "sql",
];

/// Lookup structures over known repository files.
pub struct FileIndex {
    pub full: HashSet<String>,
    pub by_basename: HashMap<String, BTreeSet<String>>,
    /// Repository directory name, used to trim `repo-name/…` prefixes.
    pub repo_name: String,
}

/// Build the basename index from known file paths.
pub fn build_basename_index(paths: &[String], repo_name: &str) -> FileIndex {
    let mut by_basename: HashMap<String, BTreeSet<String>> = HashMap::new();
    for path in paths {
        let basename = path.rsplit('/').next().unwrap_or(path).to_ascii_lowercase();
        by_basename.entry(basename).or_default().insert(path.clone());
    }
    FileIndex {
        full: paths.iter().cloned().collect(),
        by_basename,
        repo_name: repo_name.to_string(),
    }
}

/// Build a prefix → full-hash index over known commit hashes, prefixes of
/// length 10 and up. First writer wins on ambiguous prefixes.
pub fn build_commit_prefix_index(hashes: &[String]) -> HashMap<String, String> {
    let mut index = HashMap::new();
    for hash in hashes {
        let hash = hash.to_ascii_lowercase();
        for length in 10..=hash.len() {
            index.entry(hash[..length].to_string()).or_insert_with(|| hash.clone());
        }
    }
    index
}

/// Scan heading + text for file mentions.
///
/// Confidence: 1.0 exact full path, 0.95 full path after trimming the repo
/// prefix, 0.7 unique basename.
pub fn find_file_mentions(
    chunk_id: &str,
    text: &str,
    heading: &str,
    index: &FileIndex,
) -> Vec<FileMention> {
    let content = join_content(heading, text);
    // (file_path, term, method, confidence); a BTreeSet gives stable order.
    let mut candidates: BTreeSet<(String, String, &'static str, u64)> = BTreeSet::new();

    for caps in FILE_PATH_PATTERN.captures_iter(&content) {
        let m = caps.get(1).unwrap();
        if !starts_at_boundary(&content, m.start()) {
            continue;
        }
        let term = m.as_str().to_string();
        let raw = strip_mention_token(&term).to_string();
        if raw.is_empty() || IGNORE_PREFIXES.iter().any(|p| raw.to_ascii_lowercase().starts_with(p)) {
            continue;
        }
        if index.full.contains(&raw) {
            candidates.insert((raw, term, "full-path", 100));
        } else {
            let trimmed = trim_repo_prefix(&raw, &index.repo_name);
            if index.full.contains(&trimmed) {
                candidates.insert((trimmed, term, "full-path", 95));
            }
        }
    }

    for caps in FILE_BASENAME_PATTERN.captures_iter(&content) {
        let m = caps.get(1).unwrap();
        if !starts_at_boundary(&content, m.start()) {
            continue;
        }
        let term = m.as_str().to_string();
        let name = strip_mention_token(&term).to_string();
        if name.is_empty() || name.contains('/') {
            continue;
        }
        let ext = name.rsplit('.').next().unwrap_or("");
        if !SUPPORTED_EXTENSIONS.contains(&ext) {
            continue;
        }
        if let Some(matches) = index.by_basename.get(&name.to_ascii_lowercase()) {
            if matches.len() == 1 {
                let target = matches.iter().next().unwrap().clone();
                // Skip when already matched as a full path.
                if candidates.iter().any(|(path, _, _, _)| path == &target) {
                    continue;
                }
                candidates.insert((target, name, "basename", 70));
            }
        }
    }

    candidates
        .into_iter()
        .map(|(file_path, term, method, pct)| FileMention {
            chunk_id: chunk_id.to_string(),
            file_path,
            term,
            method: method.to_string(),
            confidence: pct as f64 / 100.0,
        })
        .collect()
}

/// Scan heading + text for commit mentions via the prefix index.
///
/// Confidence: 0.9 for tokens of 12+ chars, 0.75 for shorter prefixes.
pub fn find_commit_mentions(
    chunk_id: &str,
    text: &str,
    heading: &str,
    prefix_index: &HashMap<String, String>,
) -> Vec<CommitMention> {
    let content = join_content(heading, text);
    let mut mentions: HashMap<String, CommitMention> = HashMap::new();

    for m in COMMIT_PATTERN.find_iter(&content) {
        let token = strip_mention_token(m.as_str()).to_ascii_lowercase();
        if token.len() < 10 || !token.chars().all(|c| c.is_ascii_hexdigit()) {
            continue;
        }
        let mapped = prefix_index
            .get(&token)
            .or_else(|| prefix_index.get(token.get(..12).unwrap_or(token.as_str())));
        let Some(mapped) = mapped else {
            continue;
        };
        mentions.insert(
            mapped.clone(),
            CommitMention {
                chunk_id: chunk_id.to_string(),
                commit_hash: mapped.clone(),
                term: m.as_str().to_string(),
                method: "hash-prefix".to_string(),
                confidence: if token.len() >= 12 { 0.9 } else { 0.75 },
            },
        );
    }

    let mut out: Vec<CommitMention> = mentions.into_values().collect();
    out.sort_by(|a, b| a.commit_hash.cmp(&b.commit_hash));
    out
}

/// Delta-skip hash over a chunk's file mentions.
pub fn hash_file_mentions(mentions: &[FileMention]) -> Option<String> {
    if mentions.is_empty() {
        return None;
    }
    let mut sorted: Vec<_> = mentions.iter().collect();
    sorted.sort_by(|a, b| (&a.file_path, &a.term).cmp(&(&b.file_path, &b.term)));
    let mut digest = Sha1::new();
    for mention in sorted {
        digest.update(mention.file_path.as_bytes());
        digest.update(b"|");
        digest.update(mention.term.as_bytes());
    }
    Some(format!("{:x}", digest.finalize()))
}

/// Delta-skip hash over a chunk's commit mentions.
pub fn hash_commit_mentions(mentions: &[CommitMention]) -> Option<String> {
    if mentions.is_empty() {
        return None;
    }
    let mut sorted: Vec<_> = mentions.iter().collect();
    sorted.sort_by(|a, b| (&a.commit_hash, &a.term).cmp(&(&b.commit_hash, &b.term)));
    let mut digest = Sha1::new();
    for mention in sorted {
        digest.update(mention.commit_hash.as_bytes());
        digest.update(b"|");
        digest.update(mention.term.as_bytes());
    }
    Some(format!("{:x}", digest.finalize()))
}

/// The regex crate has no lookbehind; reject matches glued to a path or
/// word character so tokens inside URLs and longer paths do not resolve.
fn starts_at_boundary(content: &str, start: usize) -> bool {
    match content[..start].chars().next_back() {
        Some(c) => !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/' | '-')),
        None => true,
    }
}

fn join_content(heading: &str, text: &str) -> String {
    [heading, text]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n")
}

fn trim_repo_prefix(path: &str, repo_name: &str) -> String {
    let candidate = path.trim_start_matches("./");
    if !repo_name.is_empty() {
        if let Some(stripped) = candidate.strip_prefix(&format!("{}/", repo_name)) {
            return stripped.to_string();
        }
    }
    candidate.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn file_index() -> FileIndex {
        build_basename_index(
            &[
                "src/app.py".to_string(),
                "src/ui/view.tsx".to_string(),
                "docs/guide.md".to_string(),
            ],
            "myrepo",
        )
    }

    #[test]
    fn test_full_path_mention() {
        let mentions = find_file_mentions(
            "docs/a.md#0",
            "The entrypoint lives in src/app.py today.",
            "",
            &file_index(),
        );
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].file_path, "src/app.py");
        assert_eq!(mentions[0].method, "full-path");
        assert_eq!(mentions[0].confidence, 1.0);
    }

    #[test]
    fn test_repo_prefixed_path_trimmed() {
        let mentions = find_file_mentions(
            "c#0",
            "See myrepo/src/app.py for details.",
            "",
            &file_index(),
        );
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].file_path, "src/app.py");
        assert_eq!(mentions[0].confidence, 0.95);
    }

    #[test]
    fn test_unique_basename_mention() {
        let mentions = find_file_mentions("c#0", "Update view.tsx accordingly.", "", &file_index());
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].file_path, "src/ui/view.tsx");
        assert_eq!(mentions[0].method, "basename");
        assert_eq!(mentions[0].confidence, 0.7);
    }

    #[test]
    fn test_ambiguous_basename_skipped() {
        let index = build_basename_index(
            &["a/util.py".to_string(), "b/util.py".to_string()],
            "repo",
        );
        let mentions = find_file_mentions("c#0", "Check util.py here.", "", &index);
        assert!(mentions.is_empty());
    }

    #[test]
    fn test_url_ignored() {
        let mentions = find_file_mentions(
            "c#0",
            "Fetch https://example.com/src/app.py now.",
            "",
            &file_index(),
        );
        assert!(mentions.is_empty());
    }

    #[test]
    fn test_heading_is_scanned() {
        let mentions = find_file_mentions("c#0", "", "Notes on docs/guide.md", &file_index());
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].file_path, "docs/guide.md");
    }

    #[test]
    fn test_commit_mentions_via_prefix() {
        let full = "abcdef0123456789abcdef0123456789abcdef01".to_string();
        let index = build_commit_prefix_index(&[full.clone()]);

        let mentions =
            find_commit_mentions("c#0", "Fixed in abcdef0123456789 yesterday.", "", &index);
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].commit_hash, full);
        assert_eq!(mentions[0].confidence, 0.9);

        let mentions = find_commit_mentions("c#0", "Short ref abcdef0123.", "", &index);
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].confidence, 0.75);
    }

    #[test]
    fn test_commit_mentions_dedupe_per_target() {
        let full = "abcdef0123456789abcdef0123456789abcdef01".to_string();
        let index = build_commit_prefix_index(&[full.clone()]);
        let mentions = find_commit_mentions(
            "c#0",
            "abcdef0123456789 and abcdef0123456789abcdef01",
            "",
            &index,
        );
        assert_eq!(mentions.len(), 1);
    }

    #[test]
    fn test_mention_hash_is_order_insensitive() {
        let a = FileMention {
            chunk_id: "c#0".into(),
            file_path: "a.py".into(),
            term: "a.py".into(),
            method: "basename".into(),
            confidence: 0.7,
        };
        let b = FileMention {
            chunk_id: "c#0".into(),
            file_path: "b.py".into(),
            term: "b.py".into(),
            method: "basename".into(),
            confidence: 0.7,
        };
        let h1 = hash_file_mentions(&[a.clone(), b.clone()]);
        let h2 = hash_file_mentions(&[b, a]);
        assert_eq!(h1, h2);
        assert!(h1.is_some());
        assert_eq!(hash_file_mentions(&[]), None);
    }
}
