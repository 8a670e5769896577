//! Commit timeline buckets for the history view.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde_json::json;

use crate::domain::CommitBucket;
use crate::error::Result;
use crate::infrastructure::neo4j::GraphClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Day,
    Week,
}

impl Granularity {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "day" => Some(Granularity::Day),
            "week" => Some(Granularity::Week),
            _ => None,
        }
    }
}

/// Aggregate commits into day or week buckets. Day buckets come straight
/// from the store; week buckets fold days into ISO weeks.
pub async fn commits_buckets(
    client: &GraphClient,
    granularity: Granularity,
    from_timestamp: Option<&str>,
    to_timestamp: Option<&str>,
    limit: usize,
) -> Result<Vec<CommitBucket>> {
    let mut clauses = vec!["c.timestamp IS NOT NULL".to_string()];
    let mut params = serde_json::Map::new();
    if let Some(from_ts) = from_timestamp {
        clauses.push("c.timestamp >= $from_ts".to_string());
        params.insert("from_ts".into(), json!(from_ts));
    }
    if let Some(to_ts) = to_timestamp {
        clauses.push("c.timestamp <= $to_ts".to_string());
        params.insert("to_ts".into(), json!(to_ts));
    }
    params.insert("limit".into(), json!(limit.clamp(1, 1000)));

    let cypher = format!(
        "MATCH (c:GitCommit)
         WHERE {}
         OPTIONAL MATCH (c)-[t:TOUCHED]->()
         WITH substring(c.timestamp, 0, 10) AS bucket, count(DISTINCT c) AS commits, count(t) AS changes
         RETURN {{bucket: bucket, commit_count: commits, file_changes: changes}} AS value
         ORDER BY bucket DESC
         LIMIT $limit",
        clauses.join(" AND ")
    );

    let rows = client
        .execute_values(&cypher, serde_json::Value::Object(params))
        .await?;
    let days: Vec<CommitBucket> = rows
        .into_iter()
        .filter_map(|row| {
            Some(CommitBucket {
                bucket: row.get("bucket")?.as_str()?.to_string(),
                commit_count: row.get("commit_count")?.as_i64().unwrap_or(0),
                file_changes: row.get("file_changes")?.as_i64().unwrap_or(0),
            })
        })
        .collect();

    Ok(match granularity {
        Granularity::Day => days,
        Granularity::Week => fold_weeks(days),
    })
}

/// Fold day buckets into ISO-week buckets keyed `YYYY-Www`, newest first.
fn fold_weeks(days: Vec<CommitBucket>) -> Vec<CommitBucket> {
    let mut weeks: BTreeMap<String, CommitBucket> = BTreeMap::new();
    for day in days {
        let Ok(date) = NaiveDate::parse_from_str(&day.bucket, "%Y-%m-%d") else {
            continue;
        };
        let iso = date.iso_week();
        let key = format!("{}-W{:02}", iso.year(), iso.week());
        let entry = weeks.entry(key.clone()).or_insert(CommitBucket {
            bucket: key,
            commit_count: 0,
            file_changes: 0,
        });
        entry.commit_count += day.commit_count;
        entry.file_changes += day.file_changes;
    }
    weeks.into_values().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_granularity_parse() {
        assert_eq!(Granularity::parse("day"), Some(Granularity::Day));
        assert_eq!(Granularity::parse("week"), Some(Granularity::Week));
        assert_eq!(Granularity::parse("month"), None);
    }

    #[test]
    fn test_fold_weeks() {
        let days = vec![
            CommitBucket {
                bucket: "2025-01-06".into(), // Monday, week 2
                commit_count: 2,
                file_changes: 5,
            },
            CommitBucket {
                bucket: "2025-01-07".into(), // Tuesday, week 2
                commit_count: 1,
                file_changes: 1,
            },
            CommitBucket {
                bucket: "2025-01-01".into(), // Wednesday, week 1
                commit_count: 4,
                file_changes: 9,
            },
        ];
        let weeks = fold_weeks(days);
        assert_eq!(weeks.len(), 2);
        // Newest week first.
        assert_eq!(weeks[0].bucket, "2025-W02");
        assert_eq!(weeks[0].commit_count, 3);
        assert_eq!(weeks[0].file_changes, 6);
        assert_eq!(weeks[1].bucket, "2025-W01");
        assert_eq!(weeks[1].commit_count, 4);
    }

    #[test]
    fn test_fold_weeks_skips_bad_dates() {
        let weeks = fold_weeks(vec![CommitBucket {
            bucket: "bad".into(),
            commit_count: 1,
            file_changes: 1,
        }]);
        assert!(weeks.is_empty());
    }
}
