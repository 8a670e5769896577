//! Sprint persistence: Sprint nodes, INCLUDES by timestamp containment,
//! CONTAINS_DOC by path prefix, and sprint-level TOUCHED rollups.

use serde_json::{json, Value};
use tracing::info;

use devgraph_core::features::sprints::{sprint_doc_prefix, SprintWindow};

use crate::error::Result;
use crate::infrastructure::neo4j::GraphClient;

#[derive(Debug, Clone, Default)]
pub struct SprintMapStats {
    pub sprints_mapped: usize,
    pub commits_linked: i64,
    pub documents_linked: i64,
}

pub struct SprintWriter<'a> {
    client: &'a GraphClient,
}

impl<'a> SprintWriter<'a> {
    pub fn new(client: &'a GraphClient) -> Self {
        Self { client }
    }

    pub async fn map_sprints(&self, windows: &[SprintWindow]) -> Result<SprintMapStats> {
        let mut stats = SprintMapStats {
            sprints_mapped: windows.len(),
            ..Default::default()
        };
        if windows.is_empty() {
            return Ok(stats);
        }

        let rows = build_sprint_rows(windows);
        self.client
            .run_batched(
                "UNWIND $rows AS row
                 MERGE (s:Sprint {number: row.number})
                 ON CREATE SET s.uid = row.uid
                 SET s.name = row.name,
                     s.start_date = row.start_date,
                     s.end_date = row.end_date",
                rows,
            )
            .await?;

        for window in windows {
            stats.commits_linked += self
                .client
                .execute_count(
                    "MATCH (s:Sprint {number: $number})
                     WITH s
                     MATCH (c:GitCommit)
                     WHERE c.timestamp >= $start_ts AND c.timestamp <= $end_ts
                     MERGE (s)-[:INCLUDES]->(c)
                     RETURN count(c) AS value",
                    json!({
                        "number": window.number,
                        "start_ts": window.start_ts(),
                        "end_ts": window.end_ts(),
                    }),
                )
                .await?;

            stats.documents_linked += self
                .client
                .execute_count(
                    "MATCH (s:Sprint {number: $number})
                     WITH s
                     MATCH (d:Document)
                     WHERE d.path STARTS WITH $prefix
                     MERGE (s)-[:CONTAINS_DOC]->(d)
                     RETURN count(d) AS value",
                    json!({
                        "number": window.number,
                        "prefix": sprint_doc_prefix(&window.number),
                    }),
                )
                .await?;
        }

        info!(
            "sprint mapping: {} sprints, {} commits, {} documents",
            stats.sprints_mapped, stats.commits_linked, stats.documents_linked
        );
        Ok(stats)
    }

    /// Aggregate `(Sprint)-[:TOUCHED {scope:'sprint'}]->(File)` rollups
    /// over the sprint's included commits.
    pub async fn rollup_sprint_file_touches(&self) -> Result<i64> {
        self.client
            .execute_count(
                "MATCH (s:Sprint)-[:INCLUDES]->(c:GitCommit)-[:TOUCHED]->(f:File)
                 WITH s, f, min(c.timestamp) AS first_ts, max(c.timestamp) AS last_ts,
                      count(*) AS cnt
                 MERGE (s)-[r:TOUCHED]->(f)
                 SET r.scope = 'sprint',
                     r.first_ts = first_ts,
                     r.last_ts = last_ts,
                     r.count = cnt,
                     r.timestamp = last_ts
                 RETURN count(r) AS value",
                json!({}),
            )
            .await
    }
}

fn build_sprint_rows(windows: &[SprintWindow]) -> Vec<Value> {
    windows
        .iter()
        .map(|w| {
            json!({
                "number": w.number,
                "name": w.name,
                "start_date": w.start_date,
                "end_date": w.end_date,
                "uid": format!("sprint-{}", w.number),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sprint_rows() {
        let windows = vec![SprintWindow {
            number: "11".into(),
            name: "sprint-11".into(),
            start_date: "2025-01-01".into(),
            end_date: "2025-01-14".into(),
        }];
        let rows = build_sprint_rows(&windows);
        assert_eq!(rows[0]["number"], "11");
        assert_eq!(rows[0]["uid"], "sprint-11");
        assert_eq!(rows[0]["start_date"], "2025-01-01");
    }
}
