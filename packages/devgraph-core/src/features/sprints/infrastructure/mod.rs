//! SPRINT_STATUS.md parsing.

use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use super::domain::SprintWindow;

/// Repo-relative location of the planning status document.
pub const SPRINT_STATUS_PATH: &str = "docs/sprints/planning/SPRINT_STATUS.md";

/// `Sprint <N> ... Start Date: YYYY-MM-DD ... End Date: YYYY-MM-DD`,
/// spanning lines.
static SPRINT_WINDOW_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)Sprint\s*(\d+).{0,400}?Start Date\W*:?\s*(\d{4}-\d{2}-\d{2}).{0,400}?End Date\W*:?\s*(\d{4}-\d{2}-\d{2})",
    )
    .unwrap()
});

/// Parse sprint windows from the status document content.
///
/// Windows are sorted by start date; a window that starts before the
/// previous window ends would break the at-most-one-sprint-per-commit rule
/// and is dropped with a warning. Duplicate sprint numbers keep the first
/// occurrence.
pub fn parse_sprint_status(content: &str) -> Vec<SprintWindow> {
    let mut windows: Vec<SprintWindow> = Vec::new();
    for caps in SPRINT_WINDOW_PATTERN.captures_iter(content) {
        let number = caps[1].to_string();
        if windows.iter().any(|w| w.number == number) {
            continue;
        }
        windows.push(SprintWindow {
            name: format!("sprint-{}", number),
            number,
            start_date: caps[2].to_string(),
            end_date: caps[3].to_string(),
        });
    }

    windows.sort_by(|a, b| a.start_date.cmp(&b.start_date));

    let mut kept: Vec<SprintWindow> = Vec::new();
    for window in windows {
        if let Some(prev) = kept.last() {
            if window.start_date <= prev.end_date {
                warn!(
                    "sprint {} window {}..{} overlaps sprint {}; dropped",
                    window.number, window.start_date, window.end_date, prev.number
                );
                continue;
            }
        }
        kept.push(window);
    }
    kept
}

/// Fallback window when the status document is missing or unparseable:
/// the trailing 14 days ending today.
pub fn fallback_window() -> SprintWindow {
    let today = Utc::now().date_naive();
    let start = today - Duration::days(14);
    SprintWindow {
        number: "0".to_string(),
        name: "sprint-0".to_string(),
        start_date: start.format("%Y-%m-%d").to_string(),
        end_date: today.format("%Y-%m-%d").to_string(),
    }
}

/// Document prefix owned by a sprint (`docs/sprints/sprint-<n>/`).
pub fn sprint_doc_prefix(number: &str) -> String {
    format!("docs/sprints/sprint-{}/", number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_windows() {
        let content = "\
# Sprint Status

## Sprint 10
Status: done
Start Date: 2025-01-01
End Date: 2025-01-14

## Sprint 11
Status: active
Start Date: 2025-01-15
End Date: 2025-01-28
";
        let windows = parse_sprint_status(content);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].number, "10");
        assert_eq!(windows[0].start_date, "2025-01-01");
        assert_eq!(windows[0].end_date, "2025-01-14");
        assert_eq!(windows[1].number, "11");
        assert_eq!(windows[1].name, "sprint-11");
    }

    #[test]
    fn test_overlapping_window_dropped() {
        let content = "\
Sprint 1 Start Date: 2025-01-01 End Date: 2025-01-14
Sprint 2 Start Date: 2025-01-10 End Date: 2025-01-20
Sprint 3 Start Date: 2025-01-15 End Date: 2025-01-28
";
        let windows = parse_sprint_status(content);
        let numbers: Vec<_> = windows.iter().map(|w| w.number.as_str()).collect();
        assert_eq!(numbers, vec!["1", "3"]);
    }

    #[test]
    fn test_no_windows() {
        assert!(parse_sprint_status("nothing here").is_empty());
    }

    #[test]
    fn test_fallback_window_is_14_days() {
        let w = fallback_window();
        assert_eq!(w.number, "0");
        assert!(w.start_date < w.end_date);
    }

    #[test]
    fn test_doc_prefix() {
        assert_eq!(sprint_doc_prefix("11"), "docs/sprints/sprint-11/");
    }
}
