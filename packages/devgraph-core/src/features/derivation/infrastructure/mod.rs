//! Commit-message patterns for requirement evolution and deprecation.

use once_cell::sync::Lazy;
use regex::Regex;

/// Requirement IDs in commit messages. The message grammar accepts the
/// short `FR-\d+` form as well as the full `FR-\d{2}-\d{2}`.
static MESSAGE_REQUIREMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b((?:FR|NFR)-\d+(?:-\d+)?)\b").unwrap());

/// `<NEW> replaces|supersedes|evolves from|in favor of <OLD>`.
static EVOLUTION_FORWARD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b((?:nfr|fr)-\d+(?:-\d+)?)\b\s*(?:replaces|supersedes|evolves from|in favor of)\s*\b((?:nfr|fr)-\d+(?:-\d+)?)\b",
    )
    .unwrap()
});

/// `deprecate[d] <OLD> ... in favor of|->|to <NEW>`.
static DEPRECATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)deprecat(?:e|ed)\s+((?:nfr|fr)-\d+(?:-\d+)?)\b.*?(?:in favor of|->|to)\s+((?:nfr|fr)-\d+(?:-\d+)?)",
    )
    .unwrap()
});

/// Requirement IDs mentioned in a message, uppercased, in first-occurrence
/// order, deduplicated.
pub fn extract_requirement_ids(message: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for caps in MESSAGE_REQUIREMENT.captures_iter(message) {
        let id = caps[1].to_uppercase();
        if seen.insert(id.clone()) {
            out.push(id);
        }
    }
    out
}

/// `(new, old)` evolution pairs from explicit message patterns.
pub fn evolution_pairs(message: &str) -> Vec<(String, String)> {
    EVOLUTION_FORWARD
        .captures_iter(message)
        .map(|caps| (caps[1].to_uppercase(), caps[2].to_uppercase()))
        .filter(|(new, old)| new != old)
        .collect()
}

/// `(old, new)` deprecation pairs.
pub fn deprecation_pairs(message: &str) -> Vec<(String, String)> {
    DEPRECATION
        .captures_iter(message)
        .map(|caps| (caps[1].to_uppercase(), caps[2].to_uppercase()))
        .filter(|(old, new)| old != new)
        .collect()
}

/// When a message mentions two or more requirement IDs without an explicit
/// pattern, the earliest-by-position evolves from the latest is reversed:
/// direction is first-mentioned → second-mentioned. Returns `(new, old)`
/// or `None` when fewer than two distinct IDs appear.
pub fn requirement_pairs_in_order(message: &str) -> Option<(String, String)> {
    let ids = extract_requirement_ids(message);
    if ids.len() < 2 {
        return None;
    }
    Some((ids[0].clone(), ids[1].clone()))
}

/// Test-colocation pairing: `tests/test_foo.py` (or any `test_foo.py`)
/// implements evidence for `foo.py`. Returns the non-test stem filename.
pub fn test_colocation_target(test_path: &str) -> Option<String> {
    let name = test_path.rsplit('/').next()?;
    if let Some(stem) = name.strip_prefix("test_") {
        return stem.ends_with(".py").then(|| stem.to_string());
    }
    if let Some(stem) = name.strip_suffix("_test.py") {
        return Some(format!("{}.py", stem));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_requirement_ids() {
        let ids = extract_requirement_ids("Implement FR-01-02 and nfr-7; FR-01-02 again");
        assert_eq!(ids, vec!["FR-01-02", "NFR-7"]);
    }

    #[test]
    fn test_evolution_pairs() {
        let pairs = evolution_pairs("FR-02-01 replaces FR-01-01 in this release");
        assert_eq!(pairs, vec![("FR-02-01".to_string(), "FR-01-01".to_string())]);

        let pairs = evolution_pairs("fr-9 supersedes fr-8");
        assert_eq!(pairs, vec![("FR-9".to_string(), "FR-8".to_string())]);

        assert!(evolution_pairs("FR-1 replaces FR-1").is_empty());
        assert!(evolution_pairs("no requirements here").is_empty());
    }

    #[test]
    fn test_deprecation_pairs() {
        let pairs = deprecation_pairs("Deprecate FR-01-01 in favor of FR-02-01");
        assert_eq!(pairs, vec![("FR-01-01".to_string(), "FR-02-01".to_string())]);

        let pairs = deprecation_pairs("deprecated nfr-3 -> nfr-4");
        assert_eq!(pairs, vec![("NFR-3".to_string(), "NFR-4".to_string())]);
    }

    #[test]
    fn test_requirement_pairs_in_order() {
        let pair = requirement_pairs_in_order("Split FR-02-01 out of FR-01-01").unwrap();
        assert_eq!(pair, ("FR-02-01".to_string(), "FR-01-01".to_string()));
        assert!(requirement_pairs_in_order("Only FR-01-01 here").is_none());
    }

    #[test]
    fn test_test_colocation_target() {
        assert_eq!(
            test_colocation_target("tests/test_chunkers.py"),
            Some("chunkers.py".to_string())
        );
        assert_eq!(
            test_colocation_target("pkg/chunkers_test.py"),
            Some("chunkers.py".to_string())
        );
        assert_eq!(test_colocation_target("tests/fixtures.py"), None);
        assert_eq!(test_colocation_target("tests/test_data.json"), None);
    }
}
