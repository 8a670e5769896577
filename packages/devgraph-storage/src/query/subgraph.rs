//! The windowed subgraph engine: time-bounded, type-filtered,
//! keyset-paginated subgraph queries with a TTL cache.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use moka::sync::Cache;
use serde_json::{json, Map, Value};
use tracing::debug;

use devgraph_core::shared::models::NodeKind;

use crate::domain::{Pagination, Performance, SubgraphEdge, SubgraphNode, SubgraphPage, SubgraphQuery};
use crate::error::Result;
use crate::infrastructure::neo4j::GraphClient;

use super::cursor::Cursor;
use super::layout::{layout_hint, node_size_for_labels};
use super::telemetry::QueryTelemetry;

/// Edge types admitted into a window even without a timestamp.
const STATIC_EDGE_TYPES: &[&str] = &[
    "INCLUDES",
    "CONTAINS_DOC",
    "CONTAINS_CHUNK",
    "PART_OF",
    "IMPLEMENTS",
    "MENTIONS",
    "EVOLVES_FROM",
    "REFACTORED_TO",
];

const CACHE_TTL: Duration = Duration::from_secs(60);
const MAX_LIMIT: usize = 50_000;
/// Unbounded small queries get a trailing lookback instead of a full scan.
const DEFAULT_LOOKBACK_DAYS: i64 = 7;

pub struct SubgraphEngine {
    client: Arc<GraphClient>,
    cache: Cache<String, Arc<SubgraphPage>>,
    telemetry: QueryTelemetry,
}

impl SubgraphEngine {
    pub fn new(client: Arc<GraphClient>) -> Self {
        Self {
            client,
            cache: Cache::builder()
                .time_to_live(CACHE_TTL)
                .max_capacity(1_024)
                .build(),
            telemetry: QueryTelemetry::new(),
        }
    }

    pub fn telemetry(&self) -> &QueryTelemetry {
        &self.telemetry
    }

    pub async fn get_windowed_subgraph(&self, request: &SubgraphQuery) -> Result<SubgraphPage> {
        let started = Instant::now();

        // An inverted window matches nothing. Without this guard the
        // static-edge admission clause would still pass every
        // non-temporal edge through, since those clauses accept NULL
        // timestamps unconditionally.
        if window_is_inverted(request) {
            return Ok(empty_page(request.limit.clamp(1, MAX_LIMIT)));
        }

        let cache_key = request.cache_key();

        if let Some(cached) = self.cache.get(&cache_key) {
            self.telemetry.record_hit();
            let mut page = (*cached).clone();
            page.performance.cache_hit = true;
            return Ok(page);
        }
        self.telemetry.record_miss();

        let limit = request.limit.clamp(1, MAX_LIMIT);
        let cursor = request.cursor.as_deref().and_then(Cursor::parse);
        let default_from_ts = default_lookback_ts();
        let unbounded_small = request.from_timestamp.is_none()
            && request.to_timestamp.is_none()
            && limit <= 100;

        let (where_clause, mut params) =
            build_where(request, &cursor, unbounded_small, &default_from_ts);
        let legacy_offset = matches!(cursor, Some(Cursor::LegacyOffset(_)));
        if let Some(Cursor::LegacyOffset(offset)) = &cursor {
            params.insert("offset".to_string(), json!(offset));
        }
        params.insert("limit".to_string(), json!(limit));

        let cypher = format!(
            "MATCH (a)-[r]->(b)
             WHERE {}
             WITH a, b, r, type(r) AS rel_type, r.timestamp AS ts, elementId(r) AS rid
             ORDER BY ts DESC, rid DESC
             {}LIMIT $limit
             RETURN {{a: properties(a), a_labels: labels(a),
                      b: properties(b), b_labels: labels(b),
                      r: properties(r), rel_type: rel_type, ts: ts, rid: rid}} AS value",
            where_clause,
            if legacy_offset { "SKIP $offset " } else { "" }
        );

        let rows = self
            .client
            .execute_values(&cypher, Value::Object(params))
            .await?;

        let mut nodes_seen: BTreeMap<String, SubgraphNode> = BTreeMap::new();
        let mut edges: Vec<SubgraphEdge> = Vec::new();

        for row in rows {
            let a_id = extract_node_id(row.get("a"), row.get("a_labels"));
            let b_id = extract_node_id(row.get("b"), row.get("b_labels"));

            for (props, labels, id) in [
                (row.get("a"), row.get("a_labels"), &a_id),
                (row.get("b"), row.get("b_labels"), &b_id),
            ] {
                if !nodes_seen.contains_key(id) {
                    nodes_seen.insert(id.clone(), build_node(id, props, labels));
                }
            }

            edges.push(SubgraphEdge {
                from: a_id,
                to: b_id,
                edge_type: row
                    .get("rel_type")
                    .and_then(|v| v.as_str())
                    .unwrap_or("RELATED")
                    .to_string(),
                timestamp: row.get("ts").and_then(|v| v.as_str()).map(String::from),
                rid: row
                    .get("rid")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                properties: non_null_props(row.get("r")),
            });
        }

        let next_cursor = if edges.len() == limit {
            match (&cursor, edges.last()) {
                (_, Some(last)) if last.timestamp.is_some() && !last.rid.is_empty() => {
                    Some(Cursor::encode(last.timestamp.as_deref().unwrap(), &last.rid))
                }
                (Some(Cursor::LegacyOffset(offset)), _) => Some((offset + limit).to_string()),
                _ => None,
            }
        } else {
            None
        };

        let (total_nodes, total_edges) = if request.include_counts {
            let counts = self.recent_counts(&default_from_ts).await?;
            (Some(counts.0), Some(counts.1))
        } else {
            (None, None)
        };

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.telemetry.record_latency(elapsed_ms);
        debug!(
            "windowed subgraph: {} edges, {} nodes in {:.1}ms",
            edges.len(),
            nodes_seen.len(),
            elapsed_ms
        );

        let page = SubgraphPage {
            pagination: Pagination {
                total_nodes,
                total_edges,
                returned_nodes: nodes_seen.len(),
                returned_edges: edges.len(),
                limit,
                offset: match &cursor {
                    Some(Cursor::LegacyOffset(offset)) => *offset,
                    _ => 0,
                },
                has_more: next_cursor.is_some(),
                next_cursor,
            },
            performance: Performance {
                query_time_ms: (elapsed_ms * 100.0).round() / 100.0,
                cache_hit: false,
            },
            nodes: nodes_seen.into_values().collect(),
            edges,
        };

        self.cache.insert(cache_key, Arc::new(page.clone()));
        Ok(page)
    }

    /// Node/edge counts bounded to recent data, matching the default
    /// window heuristic.
    async fn recent_counts(&self, default_from_ts: &str) -> Result<(i64, i64)> {
        let nodes = self
            .client
            .execute_count(
                "MATCH (n)
                 WHERE n.timestamp IS NULL OR n.timestamp >= $default_from_ts
                 RETURN count(n) AS value",
                json!({ "default_from_ts": default_from_ts }),
            )
            .await?;
        let edges = self
            .client
            .execute_count(
                "MATCH ()-[r]->()
                 WHERE r.timestamp IS NULL OR r.timestamp >= $default_from_ts
                 RETURN count(r) AS value",
                json!({ "default_from_ts": default_from_ts }),
            )
            .await?;
        Ok((nodes, edges))
    }
}

fn default_lookback_ts() -> String {
    (Utc::now() - chrono::Duration::days(DEFAULT_LOOKBACK_DAYS)).to_rfc3339()
}

/// `from > to` can never admit an edge. Timestamps are RFC-3339 UTC, so
/// string comparison is chronological.
fn window_is_inverted(request: &SubgraphQuery) -> bool {
    match (&request.from_timestamp, &request.to_timestamp) {
        (Some(from), Some(to)) => from.as_str() > to.as_str(),
        _ => false,
    }
}

fn empty_page(limit: usize) -> SubgraphPage {
    SubgraphPage {
        pagination: Pagination {
            limit,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Assemble the WHERE clause and its parameters.
fn build_where(
    request: &SubgraphQuery,
    cursor: &Option<Cursor>,
    unbounded_small: bool,
    default_from_ts: &str,
) -> (String, Map<String, Value>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut params = Map::new();

    let static_types = STATIC_EDGE_TYPES
        .iter()
        .map(|t| format!("'{}'", t))
        .collect::<Vec<_>>()
        .join(", ");
    clauses.push(format!(
        "(r.timestamp IS NOT NULL OR type(r) IN [{}])",
        static_types
    ));

    if unbounded_small {
        clauses.push("(r.timestamp IS NULL OR r.timestamp >= $default_from_ts)".to_string());
        params.insert("default_from_ts".to_string(), json!(default_from_ts));
    }
    if let Some(from_ts) = &request.from_timestamp {
        clauses.push("(r.timestamp IS NULL OR r.timestamp >= $from_ts)".to_string());
        params.insert("from_ts".to_string(), json!(from_ts));
    }
    if let Some(to_ts) = &request.to_timestamp {
        clauses.push("(r.timestamp IS NULL OR r.timestamp <= $to_ts)".to_string());
        params.insert("to_ts".to_string(), json!(to_ts));
    }

    if !request.node_types.is_empty() {
        clauses.push(
            "(any(l IN labels(a) WHERE l IN $node_types) OR any(l IN labels(b) WHERE l IN $node_types))"
                .to_string(),
        );
        params.insert("node_types".to_string(), json!(request.node_types));
    }

    if let Some(Cursor::Keyset {
        timestamp,
        element_id,
    }) = cursor
    {
        clauses.push(
            "(r.timestamp < $c_ts OR (r.timestamp = $c_ts AND elementId(r) < $c_rid))".to_string(),
        );
        params.insert("c_ts".to_string(), json!(timestamp));
        params.insert("c_rid".to_string(), json!(element_id));
    }

    (clauses.join(" AND "), params)
}

/// Stable node id. Labeled nodes resolve through the closed node sum
/// (business key per label, sprints as `sprint-<n>`); unmodeled nodes fall
/// back to a property scan.
fn extract_node_id(props: Option<&Value>, labels: Option<&Value>) -> String {
    let Some(Value::Object(map)) = props else {
        return String::from("unknown");
    };

    if let Some(Value::Array(labels)) = labels {
        for label in labels.iter().filter_map(|l| l.as_str()) {
            let Some(key_prop) = NodeKind::key_property_for_label(label) else {
                continue;
            };
            let Some(key) = map.get(key_prop) else {
                continue;
            };
            let key = key
                .as_str()
                .map(String::from)
                .unwrap_or_else(|| key.to_string());
            if let Some(kind) = NodeKind::from_label(label, key) {
                return kind.graph_id();
            }
        }
    }

    for prop in ["id", "hash", "path", "name", "symbol_id"] {
        if let Some(value) = map.get(prop).and_then(|v| v.as_str()) {
            return value.to_string();
        }
    }
    String::from("unknown")
}

fn build_node(id: &str, props: Option<&Value>, labels: Option<&Value>) -> SubgraphNode {
    let labels: Vec<String> = labels
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|l| l.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    let mut properties = non_null_props(props);
    let (x, y) = match (
        properties.get("x").and_then(|v| v.as_f64()),
        properties.get("y").and_then(|v| v.as_f64()),
    ) {
        (Some(x), Some(y)) if x.is_finite() && y.is_finite() => (x, y),
        _ => layout_hint(id),
    };
    // Coordinates and size are top-level response fields; dropping them
    // here keeps the flattened property map free of duplicate keys.
    for key in ["x", "y", "size"] {
        properties.remove(key);
    }

    SubgraphNode {
        id: id.to_string(),
        size: node_size_for_labels(&labels),
        labels,
        x,
        y,
        properties,
    }
}

fn non_null_props(props: Option<&Value>) -> BTreeMap<String, Value> {
    let Some(Value::Object(map)) = props else {
        return BTreeMap::new();
    };
    map.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
