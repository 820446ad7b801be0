//! Estimate Metrics Collection
//!
//! Lock-free counters for the estimate pipeline: requests, provider attempts,
//! retries, outcomes and latency. Shared between concurrent requests and
//! surfaced by the HTTP server.
//!
//! ## Usage
//!
//! ```ignore
//! let metrics = create_shared_metrics();
//! metrics.record_request();
//! metrics.record_success(420);
//! let summary = metrics.summary();
//! ```

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

// =============================================================================
// Metrics Collector
// =============================================================================

/// Thread-safe counters for estimate execution.
pub struct EstimateMetrics {
    /// Collector start time
    start_time: Instant,
    /// Estimate requests accepted past validation
    requests: AtomicU64,
    /// Provider calls issued, including retries
    attempts: AtomicU64,
    /// Backoff sleeps taken
    retries: AtomicU64,
    /// Estimates answered by the live model
    successes: AtomicU64,
    /// Estimates answered with fallback content
    fallbacks: AtomicU64,
    /// Model replies that failed to parse
    parse_failures: AtomicU64,
    /// Total latency of successful estimates in milliseconds
    total_latency_ms: AtomicU64,
}

/// Point-in-time view of [`EstimateMetrics`]
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub uptime_secs: u64,
    pub requests: u64,
    pub attempts: u64,
    pub retries: u64,
    pub successes: u64,
    pub fallbacks: u64,
    pub parse_failures: u64,
    pub avg_latency_ms: f64,
}

impl Default for EstimateMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EstimateMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            requests: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
            parse_failures: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
        }
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a live estimate and its end-to-end latency
    pub fn record_success(&self, latency_ms: u64) {
        self.successes.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(latency_ms, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parse_failure(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn summary(&self) -> MetricsSummary {
        let successes = self.successes.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);

        let avg_latency = if successes > 0 {
            total_latency as f64 / successes as f64
        } else {
            0.0
        };

        MetricsSummary {
            uptime_secs: self.start_time.elapsed().as_secs(),
            requests: self.requests.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            successes,
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            avg_latency_ms: avg_latency,
        }
    }
}

impl MetricsSummary {
    /// Format summary for display
    pub fn display(&self) -> String {
        format!(
            "Requests: {}\n\
             Attempts: {} (retries: {})\n\
             Live: {}, Fallback: {} (parse failures: {})\n\
             Avg Latency: {:.0}ms",
            self.requests,
            self.attempts,
            self.retries,
            self.successes,
            self.fallbacks,
            self.parse_failures,
            self.avg_latency_ms
        )
    }
}

// =============================================================================
// Shared Type
// =============================================================================

/// Shared metrics collector
pub type SharedMetrics = Arc<EstimateMetrics>;

/// Create shared metrics collector
pub fn create_shared_metrics() -> SharedMetrics {
    Arc::new(EstimateMetrics::new())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_outcomes() {
        let metrics = EstimateMetrics::new();

        metrics.record_request();
        metrics.record_attempt();
        metrics.record_retry();
        metrics.record_attempt();
        metrics.record_success(400);

        metrics.record_request();
        metrics.record_attempt();
        metrics.record_parse_failure();
        metrics.record_fallback();

        let summary = metrics.summary();
        assert_eq!(summary.requests, 2);
        assert_eq!(summary.attempts, 3);
        assert_eq!(summary.retries, 1);
        assert_eq!(summary.successes, 1);
        assert_eq!(summary.fallbacks, 1);
        assert_eq!(summary.parse_failures, 1);
        assert!((summary.avg_latency_ms - 400.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_concurrent_recording() {
        use std::thread;

        let metrics = create_shared_metrics();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..100 {
                        m.record_attempt();
                        m.record_success(50);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let summary = metrics.summary();
        assert_eq!(summary.attempts, 1000);
        assert_eq!(summary.successes, 1000);
        assert!((summary.avg_latency_ms - 50.0).abs() < 0.001);
    }

    #[test]
    fn test_summary_display() {
        let metrics = EstimateMetrics::new();
        metrics.record_fallback();

        let display = metrics.summary().display();
        assert!(display.contains("Fallback: 1"));
        assert!(display.contains("Avg Latency: 0ms"));
    }
}
