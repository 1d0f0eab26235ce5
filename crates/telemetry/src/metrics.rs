//! Internal metrics collection.
//!
//! Collected in-memory with relaxed atomics; a snapshot is taken when the
//! health endpoint or an operator asks for one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 10s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000, 10000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for (i, &bound) in Self::BUCKET_BOUNDS.iter().enumerate() {
            if ms <= bound {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        // Value exceeds all buckets, add to last
        self.buckets[10].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the growth pipeline.
#[derive(Debug, Default)]
pub struct Metrics {
    // Ingestion
    pub events_ingested: Counter,
    pub events_rejected: Counter,
    pub rollup_failures: Counter,

    // Task dispatch
    pub tasks_dispatched: Counter,
    pub task_failures: Counter,

    // Derived writes
    pub periods_upserted: Counter,
    pub cohorts_upserted: Counter,
    pub insights_generated: Counter,

    // Latency histograms
    pub ingest_latency_ms: Histogram,
    pub task_latency_ms: Histogram,
    pub store_write_latency_ms: Histogram,
    pub store_query_latency_ms: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub events_ingested: u64,
    pub events_rejected: u64,
    pub rollup_failures: u64,
    pub tasks_dispatched: u64,
    pub task_failures: u64,
    pub periods_upserted: u64,
    pub cohorts_upserted: u64,
    pub insights_generated: u64,
    pub ingest_latency_mean_ms: f64,
    pub task_latency_mean_ms: f64,
    pub store_write_latency_mean_ms: f64,
    pub store_query_latency_mean_ms: f64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            events_ingested: self.events_ingested.get(),
            events_rejected: self.events_rejected.get(),
            rollup_failures: self.rollup_failures.get(),
            tasks_dispatched: self.tasks_dispatched.get(),
            task_failures: self.task_failures.get(),
            periods_upserted: self.periods_upserted.get(),
            cohorts_upserted: self.cohorts_upserted.get(),
            insights_generated: self.insights_generated.get(),
            ingest_latency_mean_ms: self.ingest_latency_ms.mean(),
            task_latency_mean_ms: self.task_latency_ms.mean(),
            store_write_latency_mean_ms: self.store_write_latency_ms.mean(),
            store_query_latency_mean_ms: self.store_query_latency_ms.mean(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_mean_and_buckets() {
        let hist = Histogram::new();
        hist.observe(3);
        hist.observe(7);
        hist.observe(20000);

        assert_eq!(hist.count(), 3);
        assert_eq!(hist.mean(), (3 + 7 + 20000) as f64 / 3.0);

        let buckets = hist.buckets();
        // 3ms lands in the 5ms bucket, 7ms in the 10ms bucket,
        // 20s overflows into the last bucket.
        assert_eq!(buckets[1], (5, 1));
        assert_eq!(buckets[2], (10, 1));
        assert_eq!(buckets[10], (10000, 1));
    }
}
