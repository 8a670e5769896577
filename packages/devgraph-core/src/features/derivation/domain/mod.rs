//! Evidence kinds and confidence math.

use serde::{Deserialize, Serialize};

/// Discriminator recorded in a derived edge's `sources[]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvidenceKind {
    CommitMessage,
    DocMention,
    TestColocation,
    DocText,
    DocTextRollup,
    Import,
    StaticAnalysis,
    SprintCommits,
}

impl EvidenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceKind::CommitMessage => "commit-message",
            EvidenceKind::DocMention => "doc-mention",
            EvidenceKind::TestColocation => "test-colocation",
            EvidenceKind::DocText => "doc-text",
            EvidenceKind::DocTextRollup => "doc-text-rollup",
            EvidenceKind::Import => "import",
            EvidenceKind::StaticAnalysis => "static-analysis",
            EvidenceKind::SprintCommits => "sprint-commits",
        }
    }
}

impl std::fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Base confidence for an IMPLEMENTS evidence kind.
pub fn base_confidence(kind: EvidenceKind) -> f64 {
    match kind {
        EvidenceKind::CommitMessage => 0.9,
        EvidenceKind::DocMention => 0.6,
        EvidenceKind::TestColocation => 0.5,
        _ => 0.5,
    }
}

/// Noisy-OR combination: `c' = 1 - (1 - c_old)(1 - c_new)`. Associative
/// and commutative; the result stays in [0, 1].
pub fn combine_confidence(old: f64, new: f64) -> f64 {
    let old = old.clamp(0.0, 1.0);
    let new = new.clamp(0.0, 1.0);
    1.0 - (1.0 - old) * (1.0 - new)
}

/// Accumulate `sources` as a set; confidence only strengthens when the
/// evidence kind is new; repeated kinds never strengthen.
pub fn merge_sources(
    sources: &mut Vec<String>,
    confidence: f64,
    kind: EvidenceKind,
    kind_confidence: f64,
) -> f64 {
    let name = kind.as_str().to_string();
    if sources.contains(&name) {
        return confidence;
    }
    sources.push(name);
    combine_confidence(confidence, kind_confidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noisy_or() {
        let c = combine_confidence(0.9, 0.6);
        assert!((c - 0.96).abs() < 1e-9);
        // Commutative.
        assert_eq!(combine_confidence(0.6, 0.9), c);
        // Bounded.
        assert!(combine_confidence(1.0, 1.0) <= 1.0);
        assert_eq!(combine_confidence(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_noisy_or_associative() {
        let a = combine_confidence(combine_confidence(0.9, 0.6), 0.5);
        let b = combine_confidence(0.9, combine_confidence(0.6, 0.5));
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn test_merge_sources_dedupes_kinds() {
        let mut sources = vec!["commit-message".to_string()];
        // Same kind twice: no strengthening.
        let c = merge_sources(&mut sources, 0.9, EvidenceKind::CommitMessage, 0.9);
        assert_eq!(c, 0.9);
        assert_eq!(sources.len(), 1);

        // A new kind strengthens and is recorded.
        let c = merge_sources(&mut sources, c, EvidenceKind::DocMention, 0.6);
        assert!((c - 0.96).abs() < 1e-9);
        assert_eq!(sources, vec!["commit-message", "doc-mention"]);
    }

    #[test]
    fn test_base_confidences() {
        assert_eq!(base_confidence(EvidenceKind::CommitMessage), 0.9);
        assert_eq!(base_confidence(EvidenceKind::DocMention), 0.6);
        assert_eq!(base_confidence(EvidenceKind::TestColocation), 0.5);
    }
}
