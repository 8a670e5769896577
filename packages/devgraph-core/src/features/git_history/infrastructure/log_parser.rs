//! State-machine parser for `git log --name-status` output.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::features::git_history::domain::{ChangeType, CommitRecord, FileChange};
use crate::shared::utils::to_utc_iso;

/// Pretty format used for all log invocations. `%B` keeps the full commit
/// message; body lines carry no tabs and are appended until the next
/// header.
pub const LOG_PRETTY_FORMAT: &str = "%H\t%an\t%ae\t%aI\t%B";

static HEX40: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-f]{40}$").unwrap());
static STATUS_FIELD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[AMDRTCU]\d*$").unwrap());

/// Parse the combined header/name-status stream into commit records.
///
/// A header line has four tabs and a 40-hex first field. A name-status line
/// has one tab (`M\tpath`) or two for renames (`R100\told\tnew`). Any other
/// line while inside a commit belongs to its multi-line message.
pub fn parse_name_status_log(output: &str) -> Vec<CommitRecord> {
    let mut commits: Vec<CommitRecord> = Vec::new();
    let mut current: Option<CommitRecord> = None;
    let mut in_message = false;
    let mut dropped = 0usize;

    for raw in output.lines() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        if let Some(header) = parse_header(line) {
            if let Some(commit) = current.take() {
                commits.push(commit);
            }
            current = Some(header);
            in_message = true;
            continue;
        }

        let Some(commit) = current.as_mut() else {
            continue;
        };

        if let Some(change) = parse_file_line(line) {
            in_message = false;
            commit.files.push(change);
        } else if in_message {
            commit.message.push('\n');
            commit.message.push_str(line);
        } else {
            dropped += 1;
        }
    }

    if let Some(commit) = current.take() {
        commits.push(commit);
    }

    for commit in &mut commits {
        commit.message = commit.message.trim().to_string();
    }

    if dropped > 0 {
        warn!("log parser dropped {} unrecognized lines", dropped);
    }
    commits
}

fn parse_header(line: &str) -> Option<CommitRecord> {
    if line.matches('\t').count() != 4 {
        return None;
    }
    let mut parts = line.splitn(5, '\t');
    let hash = parts.next()?;
    if !HEX40.is_match(hash) {
        return None;
    }
    let author = parts.next()?;
    let email = parts.next()?;
    let raw_ts = parts.next()?;
    let message = parts.next()?;

    let timestamp = match to_utc_iso(raw_ts) {
        Some(ts) => ts,
        None => {
            warn!("commit {} has unparseable timestamp {:?}", hash, raw_ts);
            return None;
        }
    };

    Some(CommitRecord {
        hash: hash.to_string(),
        author: author.to_string(),
        email: email.to_string(),
        timestamp,
        message: message.to_string(),
        files: Vec::new(),
    })
}

fn parse_file_line(line: &str) -> Option<FileChange> {
    let tabs = line.matches('\t').count();
    if tabs == 0 || tabs > 2 {
        return None;
    }
    let mut parts = line.split('\t');
    let status = parts.next()?;
    if !STATUS_FIELD.is_match(status) {
        return None;
    }
    let change_type = ChangeType::from_status(status);

    if change_type == ChangeType::Renamed && tabs == 2 {
        let src = parts.next()?;
        let dst = parts.next()?;
        let mut change = FileChange::new(dst, ChangeType::Renamed);
        change.old_path = Some(src.to_string());
        Some(change)
    } else {
        let path = parts.next()?;
        Some(FileChange::new(path, change_type))
    }
}

/// Parse `--numstat` body lines (`<added>\t<deleted>\t<path>`); binary files
/// report `-` and count as zero.
pub fn parse_numstat(output: &str) -> Vec<(String, u32, u32)> {
    let mut rows = Vec::new();
    for line in output.lines() {
        let mut parts = line.split('\t');
        let (Some(added), Some(deleted), Some(path)) =
            (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        let added: u32 = added.parse().unwrap_or(0);
        let deleted: u32 = deleted.parse().unwrap_or(0);
        if path.is_empty() {
            continue;
        }
        rows.push((path.to_string(), added, deleted));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HASH_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const HASH_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    #[test]
    fn test_parse_single_commit_with_files() {
        let output = format!(
            "{}\tAlice\talice@example.com\t2025-01-01T10:00:00+00:00\tAdd x\n\
             \n\
             A\tx.py\n\
             M\tdocs/guide.md\n",
            HASH_A
        );
        let commits = parse_name_status_log(&output);
        assert_eq!(commits.len(), 1);
        let c = &commits[0];
        assert_eq!(c.hash, HASH_A);
        assert_eq!(c.author, "Alice");
        assert_eq!(c.timestamp, "2025-01-01T10:00:00Z");
        assert_eq!(c.message, "Add x");
        assert_eq!(c.files.len(), 2);
        assert_eq!(c.files[0].change_type, ChangeType::Added);
        assert_eq!(c.files[1].path, "docs/guide.md");
    }

    #[test]
    fn test_parse_multiline_message() {
        let output = format!(
            "{}\tAlice\ta@e.com\t2025-01-01T10:00:00Z\tImplement FR-01-02\n\
             Adds the service layer.\n\
             Closes the loop.\n\
             M\tsvc.py\n",
            HASH_A
        );
        let commits = parse_name_status_log(&output);
        assert_eq!(commits.len(), 1);
        assert_eq!(
            commits[0].message,
            "Implement FR-01-02\nAdds the service layer.\nCloses the loop."
        );
        assert_eq!(commits[0].files.len(), 1);
    }

    #[test]
    fn test_parse_rename_line() {
        let output = format!(
            "{}\tBob\tb@e.com\t2025-01-02T10:00:00Z\tMove module\n\
             R100\told/foo.py\tnew/foo.py\n",
            HASH_A
        );
        let commits = parse_name_status_log(&output);
        let change = &commits[0].files[0];
        assert_eq!(change.change_type, ChangeType::Renamed);
        assert_eq!(change.path, "new/foo.py");
        assert_eq!(change.old_path.as_deref(), Some("old/foo.py"));
    }

    #[test]
    fn test_parse_multiple_commits() {
        let output = format!(
            "{}\tA\ta@e.com\t2025-01-02T10:00:00Z\tSecond\n\
             M\tx.py\n\
             {}\tA\ta@e.com\t2025-01-01T10:00:00Z\tFirst\n\
             A\tx.py\n",
            HASH_B, HASH_A
        );
        let commits = parse_name_status_log(&output);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].hash, HASH_B);
        assert_eq!(commits[1].hash, HASH_A);
    }

    #[test]
    fn test_commit_touching_no_files() {
        let output = format!("{}\tA\ta@e.com\t2025-01-01T10:00:00Z\tEmpty tree diff\n", HASH_A);
        let commits = parse_name_status_log(&output);
        assert_eq!(commits.len(), 1);
        assert!(commits[0].files.is_empty());
    }

    #[test]
    fn test_header_requires_40_hex() {
        let output = "abc\tA\ta@e.com\t2025-01-01T10:00:00Z\tShort hash\nM\tx.py\n";
        assert!(parse_name_status_log(output).is_empty());
    }

    #[test]
    fn test_parse_numstat() {
        let rows = parse_numstat("10\t2\tsrc/app.py\n-\t-\tassets/logo.png\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], ("src/app.py".to_string(), 10, 2));
        assert_eq!(rows[1], ("assets/logo.png".to_string(), 0, 0));
    }

    #[test]
    fn test_empty_output() {
        assert!(parse_name_status_log("").is_empty());
    }
}
