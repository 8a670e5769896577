use serde::{Deserialize, Serialize};

/// Closed sum of relationship types in the developer graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    Touched,
    NextCommit,
    PrevCommit,
    ContainsChunk,
    PartOf,
    Contains,
    ContainsDoc,
    Includes,
    Mentions,
    MentionsFile,
    MentionsCommit,
    MentionsSymbol,
    MentionsLibrary,
    InvolvesFile,
    DefinedIn,
    Imports,
    UsesLibrary,
    Implements,
    EvolvesFrom,
    RefactoredTo,
    DeprecatedBy,
    CoOccursWith,
    RelatesTo,
    LinksTo,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Touched => "TOUCHED",
            EdgeKind::NextCommit => "NEXT_COMMIT",
            EdgeKind::PrevCommit => "PREV_COMMIT",
            EdgeKind::ContainsChunk => "CONTAINS_CHUNK",
            EdgeKind::PartOf => "PART_OF",
            EdgeKind::Contains => "CONTAINS",
            EdgeKind::ContainsDoc => "CONTAINS_DOC",
            EdgeKind::Includes => "INCLUDES",
            EdgeKind::Mentions => "MENTIONS",
            EdgeKind::MentionsFile => "MENTIONS_FILE",
            EdgeKind::MentionsCommit => "MENTIONS_COMMIT",
            EdgeKind::MentionsSymbol => "MENTIONS_SYMBOL",
            EdgeKind::MentionsLibrary => "MENTIONS_LIBRARY",
            EdgeKind::InvolvesFile => "INVOLVES_FILE",
            EdgeKind::DefinedIn => "DEFINED_IN",
            EdgeKind::Imports => "IMPORTS",
            EdgeKind::UsesLibrary => "USES_LIBRARY",
            EdgeKind::Implements => "IMPLEMENTS",
            EdgeKind::EvolvesFrom => "EVOLVES_FROM",
            EdgeKind::RefactoredTo => "REFACTORED_TO",
            EdgeKind::DeprecatedBy => "DEPRECATED_BY",
            EdgeKind::CoOccursWith => "CO_OCCURS_WITH",
            EdgeKind::RelatesTo => "RELATES_TO",
            EdgeKind::LinksTo => "LINKS_TO",
        }
    }

    /// Temporal edges must carry a non-null `timestamp` and
    /// participate in windowed queries.
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            EdgeKind::Touched
                | EdgeKind::NextCommit
                | EdgeKind::PrevCommit
                | EdgeKind::Implements
                | EdgeKind::EvolvesFrom
                | EdgeKind::RefactoredTo
                | EdgeKind::DeprecatedBy
                | EdgeKind::LinksTo
        )
    }

    /// All temporal edge types, in schema declaration order.
    pub fn temporal_kinds() -> &'static [EdgeKind] {
        &[
            EdgeKind::Touched,
            EdgeKind::NextCommit,
            EdgeKind::PrevCommit,
            EdgeKind::Implements,
            EdgeKind::EvolvesFrom,
            EdgeKind::RefactoredTo,
            EdgeKind::DeprecatedBy,
            EdgeKind::LinksTo,
        ]
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporal_flags() {
        assert!(EdgeKind::Touched.is_temporal());
        assert!(EdgeKind::LinksTo.is_temporal());
        assert!(!EdgeKind::ContainsChunk.is_temporal());
        assert!(!EdgeKind::CoOccursWith.is_temporal());
    }

    #[test]
    fn test_temporal_kinds_all_flagged() {
        for kind in EdgeKind::temporal_kinds() {
            assert!(kind.is_temporal(), "{} should be temporal", kind);
        }
    }

    #[test]
    fn test_as_str() {
        assert_eq!(EdgeKind::NextCommit.as_str(), "NEXT_COMMIT");
        assert_eq!(EdgeKind::CoOccursWith.as_str(), "CO_OCCURS_WITH");
    }
}
