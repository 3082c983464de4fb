//! Counters for the broker backend.
//!
//! All counters are backed by atomics for lock-free concurrent access.

use std::sync::atomic::{AtomicU64, Ordering};

/// Aggregated metrics for the broker backend.
///
/// Thread-safe via atomics; cloneable via `Arc<Metrics>`.
pub struct Metrics {
    /// Requests accepted by the broker (public and administrator paths).
    pub requests_issued: AtomicU64,
    /// Callbacks the broker accepted.
    pub requests_fulfilled: AtomicU64,
    /// Callbacks rejected as stale or duplicate.
    pub callbacks_rejected: AtomicU64,
    /// Callbacks that failed for any other reason.
    pub callbacks_failed: AtomicU64,
    /// Sum of fulfillment latencies in blocks (for computing average).
    pub fulfillment_latency_sum_blocks: AtomicU64,
}

impl Metrics {
    /// Create a new zeroed metrics instance.
    pub fn new() -> Self {
        Self {
            requests_issued: AtomicU64::new(0),
            requests_fulfilled: AtomicU64::new(0),
            callbacks_rejected: AtomicU64::new(0),
            callbacks_failed: AtomicU64::new(0),
            fulfillment_latency_sum_blocks: AtomicU64::new(0),
        }
    }

    pub fn record_request(&self) {
        self.requests_issued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an accepted callback with its latency.
    pub fn record_fulfillment(&self, latency_blocks: u64) {
        self.requests_fulfilled.fetch_add(1, Ordering::Relaxed);
        self.fulfillment_latency_sum_blocks
            .fetch_add(latency_blocks, Ordering::Relaxed);
    }

    pub fn record_rejection(&self) {
        self.callbacks_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.callbacks_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Average fulfillment latency in blocks, or 0 if none.
    pub fn avg_latency_blocks(&self) -> u64 {
        let count = self.requests_fulfilled.load(Ordering::Relaxed);
        if count == 0 {
            return 0;
        }
        self.fulfillment_latency_sum_blocks.load(Ordering::Relaxed) / count
    }

    /// Serialize metrics as a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "requests_issued": self.requests_issued.load(Ordering::Relaxed),
            "requests_fulfilled": self.requests_fulfilled.load(Ordering::Relaxed),
            "callbacks_rejected": self.callbacks_rejected.load(Ordering::Relaxed),
            "callbacks_failed": self.callbacks_failed.load(Ordering::Relaxed),
            "avg_fulfillment_latency_blocks": self.avg_latency_blocks(),
        })
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_latency() {
        let metrics = Metrics::new();
        assert_eq!(metrics.avg_latency_blocks(), 0);

        metrics.record_fulfillment(3);
        metrics.record_fulfillment(5);
        assert_eq!(metrics.avg_latency_blocks(), 4);
        assert_eq!(metrics.to_json()["requests_fulfilled"], 2);
    }
}
