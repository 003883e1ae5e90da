//! Request latency accounting.
//!
//! An explicitly owned counter pair shared by the request workers; relaxed
//! atomics are enough since readers only ever see a running average.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct RequestMetrics {
    requests: AtomicU64,
    total_micros: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub avg_micros: f64,
}

impl RequestMetrics {
    pub fn observe(&self, elapsed: Duration) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.total_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests.load(Ordering::Relaxed);
        let total_micros = self.total_micros.load(Ordering::Relaxed);
        let avg_micros = if requests == 0 {
            0.0
        } else {
            total_micros as f64 / requests as f64
        };
        MetricsSnapshot {
            requests,
            avg_micros,
        }
    }
}
