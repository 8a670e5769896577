use serde::{Deserialize, Serialize};

/// Closed sum of node labels in the developer graph.
///
/// Each variant carries the business key of the node it names, so node
/// identity can be passed between components without resolving records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "label", content = "key")]
pub enum NodeKind {
    GitCommit(String),
    File(String),
    Directory(String),
    Chunk(String),
    Document(String),
    Symbol(String),
    Requirement(String),
    Sprint(String),
    Library(String),
}

impl NodeKind {
    /// Node label as written to the graph.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::GitCommit(_) => "GitCommit",
            NodeKind::File(_) => "File",
            NodeKind::Directory(_) => "Directory",
            NodeKind::Chunk(_) => "Chunk",
            NodeKind::Document(_) => "Document",
            NodeKind::Symbol(_) => "Symbol",
            NodeKind::Requirement(_) => "Requirement",
            NodeKind::Sprint(_) => "Sprint",
            NodeKind::Library(_) => "Library",
        }
    }

    /// Uniqueness property for the label.
    pub fn key_property(&self) -> &'static str {
        match self {
            NodeKind::GitCommit(_) => "hash",
            NodeKind::File(_) | NodeKind::Directory(_) | NodeKind::Document(_) => "path",
            NodeKind::Chunk(_) | NodeKind::Requirement(_) => "id",
            NodeKind::Symbol(_) => "symbol_id",
            NodeKind::Sprint(_) => "number",
            NodeKind::Library(_) => "name",
        }
    }

    /// Business key value.
    pub fn key(&self) -> &str {
        match self {
            NodeKind::GitCommit(k)
            | NodeKind::File(k)
            | NodeKind::Directory(k)
            | NodeKind::Chunk(k)
            | NodeKind::Document(k)
            | NodeKind::Symbol(k)
            | NodeKind::Requirement(k)
            | NodeKind::Sprint(k)
            | NodeKind::Library(k) => k,
        }
    }

    /// Construct from a stored label and its key value; `None` for labels
    /// outside the model.
    pub fn from_label(label: &str, key: String) -> Option<Self> {
        match label {
            "GitCommit" => Some(NodeKind::GitCommit(key)),
            "File" => Some(NodeKind::File(key)),
            "Directory" => Some(NodeKind::Directory(key)),
            "Chunk" => Some(NodeKind::Chunk(key)),
            "Document" => Some(NodeKind::Document(key)),
            "Symbol" => Some(NodeKind::Symbol(key)),
            "Requirement" => Some(NodeKind::Requirement(key)),
            "Sprint" => Some(NodeKind::Sprint(key)),
            "Library" => Some(NodeKind::Library(key)),
            _ => None,
        }
    }

    /// Uniqueness property for a label, without a constructed value.
    pub fn key_property_for_label(label: &str) -> Option<&'static str> {
        Self::from_label(label, String::new()).map(|kind| kind.key_property())
    }

    /// Graph id used by query responses: the business key, except sprints
    /// which address as `sprint-<number>`.
    pub fn graph_id(&self) -> String {
        match self {
            NodeKind::Sprint(_) => self.display_name(),
            other => other.key().to_string(),
        }
    }

    /// Short display name for logs and UIs.
    pub fn display_name(&self) -> String {
        match self {
            NodeKind::GitCommit(hash) => hash.chars().take(10).collect(),
            NodeKind::Sprint(n) => format!("sprint-{}", n),
            other => other.key().to_string(),
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.label(), self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_and_key_property() {
        let node = NodeKind::GitCommit("a".repeat(40));
        assert_eq!(node.label(), "GitCommit");
        assert_eq!(node.key_property(), "hash");

        let node = NodeKind::Symbol("src/app.py::class::App".into());
        assert_eq!(node.key_property(), "symbol_id");
        assert_eq!(node.key(), "src/app.py::class::App");
    }

    #[test]
    fn test_from_label_and_graph_id() {
        let sprint = NodeKind::from_label("Sprint", "11".into()).unwrap();
        assert_eq!(sprint.graph_id(), "sprint-11");

        let file = NodeKind::from_label("File", "src/x.py".into()).unwrap();
        assert_eq!(file.graph_id(), "src/x.py");

        assert!(NodeKind::from_label("Ghost", "x".into()).is_none());
        assert_eq!(NodeKind::key_property_for_label("Chunk"), Some("id"));
        assert_eq!(NodeKind::key_property_for_label("Ghost"), None);
    }

    #[test]
    fn test_display_name_truncates_hashes() {
        let node = NodeKind::GitCommit("abcdef0123456789".into());
        assert_eq!(node.display_name(), "abcdef0123");

        let node = NodeKind::Sprint("11".into());
        assert_eq!(node.display_name(), "sprint-11");
    }
}
