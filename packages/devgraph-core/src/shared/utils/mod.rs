//! Small shared utilities used across extraction features.

use chrono::{DateTime, SecondsFormat, Utc};

/// 1-indexed line number for a byte offset into `source`.
pub fn line_number(source: &str, index: usize) -> u32 {
    source[..index.min(source.len())].matches('\n').count() as u32 + 1
}

/// Normalize an ISO-8601 timestamp (possibly offset-bearing, as emitted by
/// `git log --pretty=%aI`) to an RFC-3339 UTC string. Lexicographic order of
/// the result equals chronological order.
pub fn to_utc_iso(ts: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Strip the punctuation that typically wraps inline mentions in prose.
pub fn strip_mention_token(value: &str) -> &str {
    value.trim_matches(|c: char| "`'\"<>[](){}.,;:".contains(c))
}

/// Line count matching `git`'s notion for a blob: trailing newline does not
/// add a line.
pub fn count_lines(content: &str) -> u32 {
    if content.is_empty() {
        return 0;
    }
    let newlines = content.matches('\n').count() as u32;
    if content.ends_with('\n') {
        newlines
    } else {
        newlines + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_number() {
        let src = "a\nb\nc";
        assert_eq!(line_number(src, 0), 1);
        assert_eq!(line_number(src, 2), 2);
        assert_eq!(line_number(src, 4), 3);
    }

    #[test]
    fn test_to_utc_iso_normalizes_offset() {
        let utc = to_utc_iso("2025-01-02T10:00:00+02:00").unwrap();
        assert_eq!(utc, "2025-01-02T08:00:00Z");
        assert!(to_utc_iso("not-a-date").is_none());
    }

    #[test]
    fn test_strip_mention_token() {
        assert_eq!(strip_mention_token("`src/app.py`,"), "src/app.py");
        assert_eq!(strip_mention_token("(abc123def0)"), "abc123def0");
    }

    #[test]
    fn test_count_lines() {
        assert_eq!(count_lines(""), 0);
        assert_eq!(count_lines("one"), 1);
        assert_eq!(count_lines("one\n"), 1);
        assert_eq!(count_lines("one\ntwo\n"), 2);
        assert_eq!(count_lines("one\ntwo"), 2);
    }
}
