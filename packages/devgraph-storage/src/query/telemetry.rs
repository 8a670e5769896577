//! Query telemetry: cache hit counters and a rolling latency window.

use std::collections::VecDeque;

use parking_lot::Mutex;

const WINDOW: usize = 100;

/// Process-local telemetry for the subgraph engine.
#[derive(Default)]
pub struct QueryTelemetry {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    cache_hits: u64,
    cache_misses: u64,
    latencies_ms: VecDeque<f64>,
}

impl QueryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.inner.lock().cache_hits += 1;
    }

    pub fn record_miss(&self) {
        self.inner.lock().cache_misses += 1;
    }

    /// Record a query latency, keeping only the last 100 samples.
    pub fn record_latency(&self, ms: f64) {
        let mut inner = self.inner.lock();
        if inner.latencies_ms.len() == WINDOW {
            inner.latencies_ms.pop_front();
        }
        inner.latencies_ms.push_back(ms);
    }

    pub fn cache_hits(&self) -> u64 {
        self.inner.lock().cache_hits
    }

    pub fn cache_misses(&self) -> u64 {
        self.inner.lock().cache_misses
    }

    /// Rolling average over the retained window.
    pub fn average_latency_ms(&self) -> f64 {
        let inner = self.inner.lock();
        if inner.latencies_ms.is_empty() {
            return 0.0;
        }
        inner.latencies_ms.iter().sum::<f64>() / inner.latencies_ms.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let t = QueryTelemetry::new();
        t.record_hit();
        t.record_hit();
        t.record_miss();
        assert_eq!(t.cache_hits(), 2);
        assert_eq!(t.cache_misses(), 1);
    }

    #[test]
    fn test_rolling_window_caps_at_100() {
        let t = QueryTelemetry::new();
        for i in 0..150 {
            t.record_latency(i as f64);
        }
        // Only the last 100 samples (50..150) remain.
        let avg = t.average_latency_ms();
        assert!((avg - 99.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_average() {
        assert_eq!(QueryTelemetry::new().average_latency_ms(), 0.0);
    }
}
