//! serde_json → bolt parameter conversion.
//!
//! Writers build UNWIND rows as JSON values; this converter turns them
//! into bolt parameters at the driver boundary.

use neo4rs::{BoltList, BoltMap, BoltNull, BoltType};
use serde_json::Value;

pub fn json_to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => BoltType::from(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                BoltType::from(i)
            } else {
                BoltType::from(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => BoltType::from(s.as_str()),
        Value::Array(items) => {
            let mut list = BoltList::default();
            for item in items {
                list.push(json_to_bolt(item));
            }
            BoltType::List(list)
        }
        Value::Object(map) => {
            let mut out = BoltMap::default();
            for (key, item) in map {
                out.put(key.as_str().into(), json_to_bolt(item));
            }
            BoltType::Map(out)
        }
    }
}

/// Attach every key of a JSON object as a query parameter.
pub fn apply_params(mut query: neo4rs::Query, params: &Value) -> neo4rs::Query {
    if let Value::Object(map) = params {
        for (key, value) in map {
            query = query.param(key, json_to_bolt(value));
        }
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_conversion() {
        assert!(matches!(json_to_bolt(&json!(null)), BoltType::Null(_)));
        assert!(matches!(json_to_bolt(&json!(true)), BoltType::Boolean(_)));
        assert!(matches!(json_to_bolt(&json!(42)), BoltType::Integer(_)));
        assert!(matches!(json_to_bolt(&json!(1.5)), BoltType::Float(_)));
        assert!(matches!(json_to_bolt(&json!("x")), BoltType::String(_)));
    }

    #[test]
    fn test_rows_conversion() {
        let rows = json!([
            {"hash": "abc", "lines_after": 10, "tags": ["a", "b"]},
            {"hash": "def", "lines_after": 0, "tags": []},
        ]);
        let bolt = json_to_bolt(&rows);
        match bolt {
            BoltType::List(list) => {
                assert_eq!(list.value.len(), 2);
                assert!(matches!(list.value[0], BoltType::Map(_)));
            }
            other => panic!("expected list, got {:?}", other),
        }
    }
}
