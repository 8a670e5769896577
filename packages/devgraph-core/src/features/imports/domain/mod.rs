//! Import edge accumulation model.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A single resolved import statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportHit {
    /// Repo-relative path of the imported file.
    pub target: String,
    pub module: Option<String>,
    pub symbol: Option<String>,
    pub line: Option<u32>,
}

/// Accumulated `(source)-[:IMPORTS]->(target)` edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportEdge {
    pub source: String,
    pub target: String,
    pub language: String,
    pub modules: BTreeSet<String>,
    pub symbols: BTreeSet<String>,
    pub lines: BTreeSet<u32>,
}

impl ImportEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, language: &str) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            language: language.to_string(),
            modules: BTreeSet::new(),
            symbols: BTreeSet::new(),
            lines: BTreeSet::new(),
        }
    }

    pub fn add(&mut self, module: Option<&str>, symbol: Option<&str>, line: Option<u32>) {
        if let Some(module) = module {
            self.modules.insert(module.to_string());
        }
        if let Some(symbol) = symbol {
            if symbol != "*" {
                self.symbols.insert(symbol.to_string());
            }
        }
        if let Some(line) = line {
            self.lines.insert(line);
        }
    }

    /// Import statement count carried on the relationship.
    pub fn count(&self) -> usize {
        self.lines.len().max(self.modules.len()).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_accumulates_sets() {
        let mut edge = ImportEdge::new("a.py", "b.py", "python");
        edge.add(Some("pkg.b"), Some("thing"), Some(3));
        edge.add(Some("pkg.b"), Some("*"), Some(9));
        edge.add(None, Some("other"), None);

        assert_eq!(edge.modules.len(), 1);
        assert_eq!(
            edge.symbols.iter().collect::<Vec<_>>(),
            vec!["other", "thing"]
        );
        assert_eq!(edge.lines.iter().copied().collect::<Vec<_>>(), vec![3, 9]);
        assert_eq!(edge.count(), 2);
    }

    #[test]
    fn test_count_floor_is_one() {
        let edge = ImportEdge::new("a.py", "b.py", "python");
        assert_eq!(edge.count(), 1);
    }
}
