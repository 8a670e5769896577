//! Query-facing domain types: windowed subgraph pages and commit buckets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters of a windowed subgraph query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubgraphQuery {
    pub from_timestamp: Option<String>,
    pub to_timestamp: Option<String>,
    pub node_types: Vec<String>,
    pub limit: usize,
    pub cursor: Option<String>,
    pub include_counts: bool,
}

impl SubgraphQuery {
    /// Cache key: the full parameter tuple with types sorted.
    pub fn cache_key(&self) -> String {
        let mut types = self.node_types.clone();
        types.sort();
        format!(
            "{}|{}|{}|{}|{}|{}",
            self.from_timestamp.as_deref().unwrap_or(""),
            self.to_timestamp.as_deref().unwrap_or(""),
            types.join(","),
            self.limit,
            self.cursor.as_deref().unwrap_or(""),
            self.include_counts
        )
    }
}

/// A node returned by the subgraph engine, with labels, non-null
/// properties, and synthesized layout hints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubgraphNode {
    pub id: String,
    pub labels: Vec<String>,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    #[serde(flatten)]
    pub properties: BTreeMap<String, Value>,
}

/// An edge returned by the subgraph engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubgraphEdge {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub edge_type: String,
    pub timestamp: Option<String>,
    pub rid: String,
    pub properties: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    pub total_nodes: Option<i64>,
    pub total_edges: Option<i64>,
    pub returned_nodes: usize,
    pub returned_edges: usize,
    pub limit: usize,
    pub offset: usize,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    pub query_time_ms: f64,
    pub cache_hit: bool,
}

/// One page of a windowed subgraph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubgraphPage {
    pub nodes: Vec<SubgraphNode>,
    pub edges: Vec<SubgraphEdge>,
    pub pagination: Pagination,
    pub performance: Performance,
}

impl Default for SubgraphNode {
    fn default() -> Self {
        Self {
            id: String::new(),
            labels: Vec::new(),
            x: 0.0,
            y: 0.0,
            size: 1.0,
            properties: BTreeMap::new(),
        }
    }
}

/// One bucket of the commit timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitBucket {
    /// Bucket start (`YYYY-MM-DD` for day granularity).
    pub bucket: String,
    pub commit_count: i64,
    pub file_changes: i64,
}
