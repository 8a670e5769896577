//! Final report: node/edge breakdowns, quality score, and post-ingest
//! guards.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use tracing::info;

use devgraph_core::shared::models::EdgeKind;
use devgraph_storage::GraphClient;

use crate::error::{OrchestrationError, Result};

/// `score = max(0, 100 − 50·orphan_ratio − 30·missing_ts_ratio)`. An
/// empty graph scores 0.
pub fn quality_score(
    orphaned: i64,
    total_nodes: i64,
    missing_timestamps: i64,
    total_edges: i64,
) -> f64 {
    if total_nodes <= 0 {
        return 0.0;
    }
    let orphan_ratio = orphaned as f64 / total_nodes as f64;
    let ts_ratio = if total_edges > 0 {
        missing_timestamps as f64 / total_edges as f64
    } else {
        0.0
    };
    let score = 100.0 - orphan_ratio * 50.0 - ts_ratio * 30.0;
    (score.max(0.0) * 10.0).round() / 10.0
}

/// Post-ingest guards: commit hash/timestamp integrity and File-flag
/// coverage. Violations are fatal for the job.
pub async fn assert_ingest_guards(client: &GraphClient) -> Result<()> {
    let bad_commits = client
        .execute_count(
            "MATCH (c:GitCommit)
             WHERE c.hash IS NULL OR size(c.hash) <> 40 OR c.timestamp IS NULL
             RETURN count(c) AS value",
            json!({}),
        )
        .await?;
    if bad_commits > 0 {
        return Err(OrchestrationError::GuardViolation(format!(
            "{} GitCommit nodes violate hash/timestamp invariants",
            bad_commits
        )));
    }

    let conflicting_flags = client
        .execute_count(
            "MATCH (f:File)
             WHERE f.is_code = true AND f.is_doc = true
             RETURN count(f) AS value",
            json!({}),
        )
        .await?;
    if conflicting_flags > 0 {
        return Err(OrchestrationError::GuardViolation(format!(
            "{} File nodes are flagged both code and doc",
            conflicting_flags
        )));
    }

    Ok(())
}

/// Final statistics for a completed job.
pub async fn generate_final_report(
    client: &GraphClient,
    total_duration_secs: f64,
    stages_completed: usize,
) -> Result<Value> {
    let node_rows = client
        .execute_values(
            "MATCH (n)
             UNWIND labels(n) AS label
             WITH label, count(*) AS total
             RETURN {label: label, total: total} AS value",
            json!({}),
        )
        .await?;
    let mut node_breakdown: BTreeMap<String, i64> = BTreeMap::new();
    for row in node_rows {
        if let (Some(label), Some(total)) = (
            row.get("label").and_then(|v| v.as_str()),
            row.get("total").and_then(|v| v.as_i64()),
        ) {
            node_breakdown.insert(label.to_string(), total);
        }
    }

    let edge_rows = client
        .execute_values(
            "MATCH ()-[r]->()
             WITH type(r) AS rel_type, count(r) AS total
             RETURN {rel_type: rel_type, total: total} AS value",
            json!({}),
        )
        .await?;
    let mut edge_breakdown: BTreeMap<String, i64> = BTreeMap::new();
    for row in edge_rows {
        if let (Some(rel_type), Some(total)) = (
            row.get("rel_type").and_then(|v| v.as_str()),
            row.get("total").and_then(|v| v.as_i64()),
        ) {
            edge_breakdown.insert(rel_type.to_string(), total);
        }
    }

    let total_nodes: i64 = node_breakdown.values().sum();
    let total_edges: i64 = edge_breakdown.values().sum();

    let orphaned = client
        .execute_count(
            "MATCH (n) WHERE NOT (n)--() RETURN count(n) AS value",
            json!({}),
        )
        .await?;

    let temporal_types: Vec<&str> = EdgeKind::temporal_kinds().iter().map(|k| k.as_str()).collect();
    let missing_timestamps = client
        .execute_count(
            "MATCH ()-[r]->()
             WHERE type(r) IN $types AND r.timestamp IS NULL
             RETURN count(r) AS value",
            json!({ "types": temporal_types }),
        )
        .await?;

    let score = quality_score(orphaned, total_nodes, missing_timestamps, total_edges);
    info!(
        "final report: {} nodes, {} edges, quality {:.1}/100",
        total_nodes, total_edges, score
    );

    Ok(json!({
        "success": true,
        "total_duration": total_duration_secs,
        "stages_completed": stages_completed,
        "final_statistics": {
            "total_nodes": total_nodes,
            "total_relationships": total_edges,
            "node_breakdown": node_breakdown,
            "relationship_breakdown": edge_breakdown,
            "quality_score": score,
            "orphaned_nodes": orphaned,
            "missing_timestamps": missing_timestamps,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_score_clean_graph() {
        assert_eq!(quality_score(0, 100, 0, 200), 100.0);
    }

    #[test]
    fn test_quality_score_empty_graph_is_zero() {
        assert_eq!(quality_score(0, 0, 0, 0), 0.0);
    }

    #[test]
    fn test_quality_score_penalties() {
        // Half the nodes orphaned: 100 - 50*0.5 = 75.
        assert_eq!(quality_score(50, 100, 0, 100), 75.0);
        // All edges missing timestamps: 100 - 30.
        assert_eq!(quality_score(0, 100, 100, 100), 70.0);
        // Both at maximum: clamped at 20, not negative.
        assert_eq!(quality_score(100, 100, 100, 100), 20.0);
    }

    #[test]
    fn test_quality_score_never_negative() {
        assert_eq!(quality_score(300, 100, 100, 100), 0.0);
    }
}
