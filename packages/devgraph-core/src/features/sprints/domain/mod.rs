use serde::{Deserialize, Serialize};

/// A sprint's planning window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SprintWindow {
    pub number: String,
    pub name: String,
    /// `YYYY-MM-DD`.
    pub start_date: String,
    /// `YYYY-MM-DD`, inclusive.
    pub end_date: String,
}

impl SprintWindow {
    /// Day-start timestamp for commit containment.
    pub fn start_ts(&self) -> String {
        format!("{}T00:00:00Z", self.start_date)
    }

    /// Day-end timestamp for commit containment.
    pub fn end_ts(&self) -> String {
        format!("{}T23:59:59Z", self.end_date)
    }

    /// Does `timestamp` (RFC-3339 UTC) fall inside this window?
    pub fn contains(&self, timestamp: &str) -> bool {
        timestamp >= self.start_ts().as_str() && timestamp <= self.end_ts().as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> SprintWindow {
        SprintWindow {
            number: "11".into(),
            name: "sprint-11".into(),
            start_date: "2025-01-01".into(),
            end_date: "2025-01-14".into(),
        }
    }

    #[test]
    fn test_containment_bounds() {
        let w = window();
        assert!(w.contains("2025-01-01T00:00:00Z"));
        assert!(w.contains("2025-01-14T23:59:59Z"));
        assert!(w.contains("2025-01-07T12:30:00Z"));
        assert!(!w.contains("2024-12-31T23:59:59Z"));
        assert!(!w.contains("2025-01-15T00:00:00Z"));
    }
}
