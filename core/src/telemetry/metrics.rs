use serde::Serialize;
use std::sync::Mutex;

use crate::telemetry::router::RouteOutcome;

/// Counters for routed payloads and viewport recomputes.
pub struct SyncMetrics {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub applied: usize,
    pub filtered: usize,
    pub out_of_view: usize,
    pub malformed: usize,
    pub recomputes: usize,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_outcome(&self, outcome: RouteOutcome) {
        if let Ok(mut metrics) = self.inner.lock() {
            match outcome {
                RouteOutcome::Updated(_) => metrics.applied += 1,
                RouteOutcome::Filtered => metrics.filtered += 1,
                RouteOutcome::OutOfView(_) => metrics.out_of_view += 1,
            }
        }
    }

    pub fn record_malformed(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.malformed += 1;
        }
    }

    pub fn record_recompute(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.recomputes += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}
