//! Commit ingestion writes: GitCommit/File nodes, TOUCHED edges, rename
//! refactors, requirement provenance, and the commit-ordering post-pass.

use std::collections::BTreeSet;

use serde_json::{json, Value};
use tracing::info;

use devgraph_core::config::{is_code_extension, is_doc_extension, language_for_extension};
use devgraph_core::features::derivation::{
    deprecation_pairs, evolution_pairs, extract_requirement_ids,
};
use devgraph_core::features::git_history::{ChangeType, CommitRecord};

use crate::error::Result;
use crate::infrastructure::neo4j::GraphClient;

#[derive(Debug, Clone, Default)]
pub struct CommitWriteStats {
    pub commits_written: usize,
    pub files_touched: usize,
    pub renames: usize,
    pub requirements: usize,
    pub ordering_edges: usize,
}

/// Writes commit batches. TOUCHED edges land after their GitCommit nodes
/// within the same call; ordering edges are written only after all commit
/// batches are persisted.
pub struct CommitWriter<'a> {
    client: &'a GraphClient,
}

impl<'a> CommitWriter<'a> {
    pub fn new(client: &'a GraphClient) -> Self {
        Self { client }
    }

    pub async fn write_commits(&self, commits: &[CommitRecord]) -> Result<CommitWriteStats> {
        let mut stats = CommitWriteStats::default();
        if commits.is_empty() {
            return Ok(stats);
        }

        let commit_rows = build_commit_rows(commits);
        stats.commits_written = self
            .client
            .run_batched(
                "UNWIND $rows AS row
                 MERGE (c:GitCommit {hash: row.hash})
                 ON CREATE SET c.message = row.message,
                               c.author = row.author,
                               c.email = row.email,
                               c.timestamp = row.timestamp,
                               c.branch = row.branch,
                               c.uid = row.hash
                 ON MATCH SET c.message = coalesce(row.message, c.message),
                              c.author = coalesce(row.author, c.author),
                              c.email = coalesce(row.email, c.email),
                              c.timestamp = coalesce(row.timestamp, c.timestamp),
                              c.uid = coalesce(c.uid, row.hash)",
                commit_rows,
            )
            .await?;

        let touched_rows = build_touched_rows(commits);
        stats.files_touched = self
            .client
            .run_batched(
                "UNWIND $rows AS row
                 MERGE (f:File {path: row.path})
                 ON CREATE SET f.uid = row.path,
                               f.extension = row.extension,
                               f.language = row.language,
                               f.is_code = row.is_code,
                               f.is_doc = row.is_doc
                 ON MATCH SET f.extension = coalesce(f.extension, row.extension),
                              f.language = coalesce(f.language, row.language),
                              f.is_code = coalesce(f.is_code, row.is_code),
                              f.is_doc = coalesce(f.is_doc, row.is_doc)
                 WITH f, row
                 MATCH (c:GitCommit {hash: row.commit_hash})
                 MERGE (c)-[r:TOUCHED]->(f)
                 SET r.change_type = row.change_type,
                     r.timestamp = row.timestamp,
                     r.lines_after = row.lines_after,
                     r.additions = row.additions,
                     r.deletions = row.deletions,
                     f.loc = row.lines_after",
                touched_rows,
            )
            .await?;

        let rename_rows = build_rename_rows(commits);
        stats.renames = self
            .client
            .run_batched(
                "UNWIND $rows AS row
                 MERGE (o:File {path: row.old_path})
                 ON CREATE SET o.uid = row.old_path
                 MERGE (n:File {path: row.new_path})
                 ON CREATE SET n.uid = row.new_path
                 MERGE (o)-[rel:REFACTORED_TO]->(n)
                 ON CREATE SET rel.refactor_type = 'rename',
                               rel.commit = row.commit_hash,
                               rel.timestamp = row.timestamp
                 ON MATCH SET rel.commit = coalesce(rel.commit, row.commit_hash),
                              rel.timestamp = coalesce(rel.timestamp, row.timestamp)",
                rename_rows,
            )
            .await?;

        let requirement_rows = build_requirement_rows(commits);
        stats.requirements = self
            .client
            .run_batched(
                "UNWIND $rows AS row
                 MERGE (r:Requirement {id: row.id})
                 ON CREATE SET r.title = row.title,
                               r.author = row.author,
                               r.date_created = row.date_created,
                               r.uid = row.id
                 ON MATCH SET r.title = coalesce(r.title, row.title),
                              r.uid = coalesce(r.uid, row.id)
                 WITH r, row
                 MATCH (c:GitCommit {hash: row.commit_hash})
                 MERGE (c)-[rel:IMPLEMENTS]->(r)
                 ON CREATE SET rel.timestamp = row.timestamp,
                               rel.provenance = 'commit-message'
                 ON MATCH SET rel.timestamp = coalesce(rel.timestamp, row.timestamp)",
                requirement_rows,
            )
            .await?;

        let evolution_rows = build_evolution_rows(commits);
        self.client
            .run_batched(
                "UNWIND $rows AS row
                 MERGE (n:Requirement {id: row.new_id})
                 ON CREATE SET n.uid = row.new_id
                 MERGE (o:Requirement {id: row.old_id})
                 ON CREATE SET o.uid = row.old_id
                 MERGE (n)-[rel:EVOLVES_FROM]->(o)
                 ON CREATE SET rel.commit = row.commit_hash,
                               rel.timestamp = row.timestamp,
                               rel.sources = ['commit-message'],
                               rel.confidence = 0.7
                 ON MATCH SET rel.timestamp = coalesce(rel.timestamp, row.timestamp)",
                evolution_rows,
            )
            .await?;

        let deprecation_rows = build_deprecation_rows(commits);
        self.client
            .run_batched(
                "UNWIND $rows AS row
                 MERGE (o:Requirement {id: row.old_id})
                 ON CREATE SET o.uid = row.old_id
                 MERGE (n:Requirement {id: row.new_id})
                 ON CREATE SET n.uid = row.new_id
                 MERGE (o)-[rel:DEPRECATED_BY]->(n)
                 ON CREATE SET rel.commit = row.commit_hash,
                               rel.reason = 'commit_message',
                               rel.timestamp = row.timestamp
                 ON MATCH SET rel.timestamp = coalesce(rel.timestamp, row.timestamp)",
                deprecation_rows,
            )
            .await?;

        let directory_rows = build_directory_rows(commits);
        self.client
            .run_batched(
                "UNWIND $rows AS row
                 MERGE (d:Directory {path: row.path})
                 ON CREATE SET d.uid = row.path,
                               d.depth = row.depth,
                               d.parent_path = row.parent_path
                 WITH d, row
                 WHERE row.parent_path IS NOT NULL
                 MERGE (p:Directory {path: row.parent_path})
                 MERGE (p)-[:CONTAINS]->(d)",
                directory_rows,
            )
            .await?;

        let containment_rows = build_file_containment_rows(commits);
        self.client
            .run_batched(
                "UNWIND $rows AS row
                 MATCH (d:Directory {path: row.dir_path})
                 MERGE (f:File {path: row.file_path})
                 MERGE (d)-[:CONTAINS]->(f)",
                containment_rows,
            )
            .await?;

        info!(
            "commit batch written: {} commits, {} touches, {} renames",
            stats.commits_written, stats.files_touched, stats.renames
        );
        Ok(stats)
    }

    /// Post-pass: total order over commits by `(timestamp, hash)`, written
    /// after all commits in the ingest are persisted.
    pub async fn write_commit_ordering(&self, commits: &[CommitRecord]) -> Result<usize> {
        let pairs = ordering_pairs(commits);
        if pairs.is_empty() {
            return Ok(0);
        }

        let next_rows: Vec<Value> = pairs
            .iter()
            .map(|(current, next, next_ts)| {
                json!({ "current": current, "next": next, "timestamp": next_ts })
            })
            .collect();
        let written = self
            .client
            .run_batched(
                "UNWIND $rows AS row
                 MATCH (current:GitCommit {hash: row.current})
                 MATCH (next:GitCommit {hash: row.next})
                 MERGE (current)-[r:NEXT_COMMIT]->(next)
                 SET r.timestamp = row.timestamp",
                next_rows,
            )
            .await?;

        // PREV_COMMIT points from the later commit back; it carries that
        // later commit's timestamp, same as its NEXT_COMMIT twin.
        let prev_rows: Vec<Value> = pairs
            .iter()
            .map(|(current, next, next_ts)| {
                json!({ "current": next, "prev": current, "timestamp": next_ts })
            })
            .collect();
        self.client
            .run_batched(
                "UNWIND $rows AS row
                 MATCH (current:GitCommit {hash: row.current})
                 MATCH (prev:GitCommit {hash: row.prev})
                 MERGE (current)-[r:PREV_COMMIT]->(prev)
                 SET r.timestamp = row.timestamp",
                prev_rows,
            )
            .await?;

        Ok(written * 2)
    }
}

fn build_commit_rows(commits: &[CommitRecord]) -> Vec<Value> {
    commits
        .iter()
        .map(|c| {
            json!({
                "hash": c.hash,
                "message": c.message,
                "author": c.author,
                "email": c.email,
                "timestamp": c.timestamp,
                "branch": "unknown",
            })
        })
        .collect()
}

fn build_touched_rows(commits: &[CommitRecord]) -> Vec<Value> {
    let mut rows = Vec::new();
    for commit in commits {
        for change in &commit.files {
            let extension = change
                .path
                .rsplit('.')
                .next()
                .filter(|ext| !ext.contains('/'))
                .unwrap_or("")
                .to_ascii_lowercase();
            rows.push(json!({
                "commit_hash": commit.hash,
                "path": change.path,
                "change_type": change.change_type.as_str(),
                "timestamp": commit.timestamp,
                "lines_after": change.lines_after,
                "additions": change.additions,
                "deletions": change.deletions,
                "extension": extension,
                "language": language_for_extension(&extension),
                "is_code": is_code_extension(&extension),
                "is_doc": is_doc_extension(&extension),
            }));
        }
    }
    rows
}

fn build_rename_rows(commits: &[CommitRecord]) -> Vec<Value> {
    let mut rows = Vec::new();
    for commit in commits {
        for change in &commit.files {
            if change.change_type != ChangeType::Renamed {
                continue;
            }
            let Some(old_path) = &change.old_path else {
                continue;
            };
            if old_path == &change.path {
                continue;
            }
            rows.push(json!({
                "old_path": old_path,
                "new_path": change.path,
                "commit_hash": commit.hash,
                "timestamp": commit.timestamp,
            }));
        }
    }
    rows
}

fn build_requirement_rows(commits: &[CommitRecord]) -> Vec<Value> {
    let mut rows = Vec::new();
    for commit in commits {
        let title: String = commit.message.lines().next().unwrap_or("").chars().take(120).collect();
        for req_id in extract_requirement_ids(&commit.message) {
            rows.push(json!({
                "id": req_id,
                "title": title,
                "author": commit.email,
                "date_created": commit.timestamp,
                "commit_hash": commit.hash,
                "timestamp": commit.timestamp,
            }));
        }
    }
    rows
}

fn build_evolution_rows(commits: &[CommitRecord]) -> Vec<Value> {
    let mut rows = Vec::new();
    for commit in commits {
        for (new_id, old_id) in evolution_pairs(&commit.message) {
            rows.push(json!({
                "new_id": new_id,
                "old_id": old_id,
                "commit_hash": commit.hash,
                "timestamp": commit.timestamp,
            }));
        }
    }
    rows
}

fn build_deprecation_rows(commits: &[CommitRecord]) -> Vec<Value> {
    let mut rows = Vec::new();
    for commit in commits {
        for (old_id, new_id) in deprecation_pairs(&commit.message) {
            rows.push(json!({
                "old_id": old_id,
                "new_id": new_id,
                "commit_hash": commit.hash,
                "timestamp": commit.timestamp,
            }));
        }
    }
    rows
}

/// Sorted `(current, next, next_ts)` pairs over the distinct commits,
/// ordered by `(timestamp, hash)` ascending.
fn ordering_pairs(commits: &[CommitRecord]) -> Vec<(String, String, String)> {
    let ordered: Vec<(&str, &str)> = commits
        .iter()
        .map(|c| (c.timestamp.as_str(), c.hash.as_str()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    ordered
        .windows(2)
        .map(|pair| {
            let (_, current) = pair[0];
            let (next_ts, next) = pair[1];
            (current.to_string(), next.to_string(), next_ts.to_string())
        })
        .collect()
}

fn build_directory_rows(commits: &[CommitRecord]) -> Vec<Value> {
    let mut directories: BTreeSet<String> = BTreeSet::new();
    for commit in commits {
        for change in &commit.files {
            let parts: Vec<&str> = change.path.split('/').collect();
            for depth in 1..parts.len() {
                directories.insert(parts[..depth].join("/"));
            }
        }
    }
    directories
        .into_iter()
        .map(|path| {
            let depth = path.matches('/').count();
            let parent_path = path.rsplit_once('/').map(|(parent, _)| parent.to_string());
            json!({ "path": path, "depth": depth, "parent_path": parent_path })
        })
        .collect()
}

fn build_file_containment_rows(commits: &[CommitRecord]) -> Vec<Value> {
    let mut pairs: BTreeSet<(String, String)> = BTreeSet::new();
    for commit in commits {
        for change in &commit.files {
            if let Some((dir, _)) = change.path.rsplit_once('/') {
                pairs.insert((dir.to_string(), change.path.clone()));
            }
        }
    }
    pairs
        .into_iter()
        .map(|(dir_path, file_path)| json!({ "dir_path": dir_path, "file_path": file_path }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use devgraph_core::features::git_history::FileChange;
    use pretty_assertions::assert_eq;

    fn commit(hash: &str, ts: &str, message: &str, files: Vec<FileChange>) -> CommitRecord {
        CommitRecord {
            hash: hash.repeat(40 / hash.len()),
            author: "Alice".into(),
            email: "alice@example.com".into(),
            timestamp: ts.into(),
            message: message.into(),
            files,
        }
    }

    #[test]
    fn test_touched_rows_carry_file_flags() {
        let c = commit(
            "a",
            "2025-01-01T10:00:00Z",
            "Add",
            vec![
                FileChange::new("src/x.py", ChangeType::Added),
                FileChange::new("docs/a.md", ChangeType::Modified),
            ],
        );
        let rows = build_touched_rows(&[c]);
        assert_eq!(rows[0]["is_code"], true);
        assert_eq!(rows[0]["is_doc"], false);
        assert_eq!(rows[0]["language"], "python");
        assert_eq!(rows[1]["is_doc"], true);
        assert_eq!(rows[1]["is_code"], false);
    }

    #[test]
    fn test_deleted_file_row_has_zero_lines() {
        let mut change = FileChange::new("gone.py", ChangeType::Deleted);
        change.lines_after = 0;
        let c = commit("a", "2025-01-01T10:00:00Z", "Remove", vec![change]);
        let rows = build_touched_rows(&[c]);
        assert_eq!(rows[0]["change_type"], "D");
        assert_eq!(rows[0]["lines_after"], 0);
    }

    #[test]
    fn test_rename_rows() {
        let mut change = FileChange::new("new/foo.py", ChangeType::Renamed);
        change.old_path = Some("old/foo.py".into());
        let c = commit("a", "2025-01-02T10:00:00Z", "Move", vec![change]);
        let rows = build_rename_rows(&[c]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["old_path"], "old/foo.py");
        assert_eq!(rows[0]["new_path"], "new/foo.py");
        assert_eq!(rows[0]["timestamp"], "2025-01-02T10:00:00Z");
    }

    #[test]
    fn test_requirement_rows_from_message() {
        let c = commit("c", "2025-01-03T10:00:00Z", "Implement FR-01-02", vec![]);
        let rows = build_requirement_rows(&[c]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "FR-01-02");
        assert_eq!(rows[0]["title"], "Implement FR-01-02");
    }

    #[test]
    fn test_ordering_pairs_sorted_by_timestamp_then_hash() {
        let commits = vec![
            commit("b", "2025-01-02T10:00:00Z", "Second", vec![]),
            commit("a", "2025-01-01T10:00:00Z", "First", vec![]),
        ];
        let pairs = ordering_pairs(&commits);
        assert_eq!(pairs.len(), 1);
        let (current, next, next_ts) = &pairs[0];
        assert!(current.starts_with('a'));
        assert!(next.starts_with('b'));
        // Both ordering edges carry the later commit's timestamp.
        assert_eq!(next_ts, "2025-01-02T10:00:00Z");
    }

    #[test]
    fn test_ordering_ties_break_by_hash() {
        let commits = vec![
            commit("b", "2025-01-01T10:00:00Z", "B", vec![]),
            commit("a", "2025-01-01T10:00:00Z", "A", vec![]),
        ];
        let pairs = ordering_pairs(&commits);
        assert!(pairs[0].0.starts_with('a'));
        assert!(pairs[0].1.starts_with('b'));
    }

    #[test]
    fn test_single_commit_has_no_ordering() {
        let commits = vec![commit("a", "2025-01-01T10:00:00Z", "Only", vec![])];
        assert!(ordering_pairs(&commits).is_empty());
    }

    #[test]
    fn test_directory_rows() {
        let c = commit(
            "a",
            "2025-01-01T10:00:00Z",
            "Add",
            vec![FileChange::new("src/ui/view.tsx", ChangeType::Added)],
        );
        let rows = build_directory_rows(&[c.clone()]);
        let paths: Vec<_> = rows.iter().map(|r| r["path"].as_str().unwrap()).collect();
        assert_eq!(paths, vec!["src", "src/ui"]);
        assert_eq!(rows[0]["parent_path"], Value::Null);
        assert_eq!(rows[1]["parent_path"], "src");
        assert_eq!(rows[1]["depth"], 1);

        let containment = build_file_containment_rows(&[c]);
        assert_eq!(containment.len(), 1);
        assert_eq!(containment[0]["dir_path"], "src/ui");
    }

    #[test]
    fn test_evolution_and_deprecation_rows() {
        let c = commit(
            "a",
            "2025-01-01T10:00:00Z",
            "FR-02-01 replaces FR-01-01. Deprecate NFR-1 in favor of NFR-2",
            vec![],
        );
        let evolution = build_evolution_rows(&[c.clone()]);
        assert_eq!(evolution[0]["new_id"], "FR-02-01");
        assert_eq!(evolution[0]["old_id"], "FR-01-01");

        let deprecation = build_deprecation_rows(&[c]);
        assert_eq!(deprecation[0]["old_id"], "NFR-1");
        assert_eq!(deprecation[0]["new_id"], "NFR-2");
    }
}
