//! High-level git history reader built on the executor and log parser.

use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::Result;
use crate::features::git_history::domain::{
    ChangeType, CommitDetail, CommitRecord, CommitSource, FileEvent,
};
use crate::shared::utils::{count_lines, to_utc_iso};

use super::git_executor::{GitExecutor, LOG_TIMEOUT, SHOW_TIMEOUT};
use super::log_parser::{parse_name_status_log, parse_numstat, LOG_PRETTY_FORMAT};

/// Default worker count for per-file LOC enrichment.
pub fn default_workers() -> usize {
    num_cpus::get().clamp(4, 8)
}

/// Reads commit history, file history, and blob content from a working
/// tree. Never mutates the repository.
pub struct GitHistoryReader {
    executor: GitExecutor,
    workers: usize,
}

impl GitHistoryReader {
    pub fn new(repo_path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            executor: GitExecutor::new(repo_path)?,
            workers: default_workers(),
        })
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.clamp(1, 16);
        self
    }

    pub fn repo_path(&self) -> &Path {
        self.executor.repo_path()
    }

    /// Compute `lines_after` for every file change by reading blob content
    /// at each commit. Deletions stay at 0. Runs in a bounded rayon pool.
    pub fn enrich_lines_after(&self, commits: &mut [CommitRecord]) {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build();
        let Ok(pool) = pool else {
            // Fall back to the global pool when a local one cannot start.
            self.enrich_in_current_pool(commits);
            return;
        };
        pool.install(|| self.enrich_in_current_pool(commits));
    }

    fn enrich_in_current_pool(&self, commits: &mut [CommitRecord]) {
        commits.par_iter_mut().for_each(|commit| {
            for change in &mut commit.files {
                if change.change_type == ChangeType::Deleted {
                    change.lines_after = 0;
                    continue;
                }
                change.lines_after = self
                    .file_content_at(&commit.hash, &change.path)
                    .map(|content| count_lines(&content))
                    .unwrap_or(0);
            }
        });
    }

    /// Keep only commits strictly newer than the watermark commit. When the
    /// watermark is unknown the full set is returned.
    pub fn filter_since(&self, commits: Vec<CommitRecord>, last_commit: &str) -> Vec<CommitRecord> {
        let Ok(Some(detail)) = self.commit_detail(last_commit) else {
            return commits;
        };
        let watermark = detail.commit.timestamp;
        let before = commits.len();
        let kept: Vec<_> = commits
            .into_iter()
            .filter(|c| c.timestamp.as_str() > watermark.as_str())
            .collect();
        info!(
            "delta filter kept {}/{} commits newer than {}",
            kept.len(),
            before,
            watermark
        );
        kept
    }
}

impl CommitSource for GitHistoryReader {
    fn list_commits(&self, limit: usize, path_filter: Option<&str>) -> Result<Vec<CommitRecord>> {
        let limit = limit.clamp(1, 10_000);
        let pretty = format!("--pretty=format:{}", LOG_PRETTY_FORMAT);
        let count = format!("-n{}", limit);

        let result = match path_filter {
            Some(path) => self.executor.run(
                &["log", "--follow", "-M", "--name-status", &pretty, &count, "--", path],
                LOG_TIMEOUT,
            ),
            None => self.executor.run(
                &["log", "-M", "--name-status", &pretty, &count],
                LOG_TIMEOUT,
            ),
        };

        // A repository with no commits yet is an empty history, not a
        // failure.
        let output = match result {
            Ok(output) => output,
            Err(crate::error::CoreError::GitCommand(msg))
                if msg.contains("does not have any commits") =>
            {
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let commits = parse_name_status_log(&output);
        debug!("parsed {} commits from git log", commits.len());
        Ok(commits)
    }

    fn commit_detail(&self, hash: &str) -> Result<Option<CommitDetail>> {
        let pretty = format!("--pretty=format:{}", LOG_PRETTY_FORMAT);
        let status_out = match self.executor.run(
            &["show", "--name-status", &pretty, hash],
            LOG_TIMEOUT,
        ) {
            Ok(out) => out,
            // Unknown hash is a missing artifact, not a failure.
            Err(_) => return Ok(None),
        };

        let mut commits = parse_name_status_log(&status_out);
        let Some(commit) = commits.drain(..).next() else {
            return Ok(None);
        };

        let mut lines_added = 0u32;
        let mut lines_deleted = 0u32;
        if let Ok(numstat_out) = self
            .executor
            .run(&["show", "--numstat", "--pretty=format:", hash], LOG_TIMEOUT)
        {
            for (_, added, deleted) in parse_numstat(&numstat_out) {
                lines_added += added;
                lines_deleted += deleted;
            }
        }

        let files_changed = commit.files.len();
        Ok(Some(CommitDetail {
            commit,
            files_changed,
            lines_added,
            lines_deleted,
        }))
    }

    fn file_history(&self, path: &str, limit: usize) -> Result<Vec<FileEvent>> {
        let limit = limit.clamp(1, 2_000);
        let pretty = format!("--pretty=format:{}", LOG_PRETTY_FORMAT);
        let count = format!("-n{}", limit);
        let output = self.executor.run(
            &["log", "--follow", "-M", "--name-status", &pretty, &count, "--", path],
            LOG_TIMEOUT,
        )?;

        let mut events = Vec::new();
        for commit in parse_name_status_log(&output) {
            for change in &commit.files {
                let raw_status = match change.change_type {
                    ChangeType::Renamed => "R100".to_string(),
                    other => other.as_str().to_string(),
                };
                events.push(FileEvent {
                    hash: commit.hash.clone(),
                    author: commit.author.clone(),
                    email: commit.email.clone(),
                    timestamp: commit.timestamp.clone(),
                    message: commit.message.clone(),
                    change_type: raw_status,
                    path: change.old_path.is_none().then(|| change.path.clone()),
                    src_path: change.old_path.clone(),
                    dst_path: change.old_path.is_some().then(|| change.path.clone()),
                });
            }
        }
        Ok(events)
    }

    fn file_content_at(&self, hash: &str, path: &str) -> Option<String> {
        let posix_path = path.replace('\\', "/");
        let spec = format!("{}:{}", hash, posix_path);
        self.executor.run(&["show", &spec], SHOW_TIMEOUT).ok()
    }
}

// Timestamp strings compare lexicographically; keep the helper here so the
// reader and tests share one definition of "newer".
pub fn is_newer(candidate: &str, watermark: &str) -> bool {
    match (to_utc_iso(candidate), to_utc_iso(watermark)) {
        (Some(a), Some(b)) => a > b,
        _ => candidate > watermark,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_workers_bounds() {
        let workers = default_workers();
        assert!((4..=8).contains(&workers));
    }

    #[test]
    fn test_is_newer() {
        assert!(is_newer("2025-01-02T10:00:00Z", "2025-01-01T10:00:00Z"));
        assert!(!is_newer("2025-01-01T10:00:00Z", "2025-01-01T10:00:00Z"));
        // Offset forms normalize before comparison.
        assert!(is_newer("2025-01-01T12:00:00+01:00", "2025-01-01T10:00:00Z"));
    }
}
