use common::Statistics;
use std::{
    collections::VecDeque,
    fmt::Write,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, PoisonError,
    },
    time::Instant,
};

/// Process-local counters. Everything resets on restart.
#[derive(Debug)]
pub struct Metrics {
    started: Instant,
    total_requests: AtomicU64,
    total_predictions: AtomicU64,
    total_errors: AtomicU64,
    total_health_checks: AtomicU64,
    latencies_ms: Mutex<VecDeque<f64>>,
    window: usize,
}

impl Metrics {
    pub fn new(window: usize) -> Self {
        Self {
            started: Instant::now(),
            total_requests: AtomicU64::new(0),
            total_predictions: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            total_health_checks: AtomicU64::new(0),
            latencies_ms: Mutex::new(VecDeque::with_capacity(window)),
            window: window.max(1),
        }
    }

    pub fn record_request(&self, latency_ms: f64, is_error: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if is_error {
            self.total_errors.fetch_add(1, Ordering::Relaxed);
        }

        let mut latencies = self
            .latencies_ms
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if latencies.len() == self.window {
            latencies.pop_front();
        }
        latencies.push_back(latency_ms);
    }

    pub fn record_prediction(&self) {
        self.total_predictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_health_check(&self) {
        self.total_health_checks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn total_predictions(&self) -> u64 {
        self.total_predictions.load(Ordering::Relaxed)
    }

    pub fn total_errors(&self) -> u64 {
        self.total_errors.load(Ordering::Relaxed)
    }

    pub fn uptime_seconds(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    pub fn latency(&self) -> Statistics {
        let samples: Vec<f64> = self
            .latencies_ms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect();
        Statistics::from_samples(&samples)
    }

    /// Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let counters = [
            ("app_total_requests", "Total number of requests", self.total_requests()),
            ("app_total_predictions", "Total number of predictions made", self.total_predictions()),
            ("app_total_errors", "Total number of error responses", self.total_errors()),
            (
                "app_total_health_checks",
                "Total number of health checks",
                self.total_health_checks.load(Ordering::Relaxed),
            ),
        ];

        for (name, help, value) in counters {
            let _ = writeln!(out, "# HELP {} {}", name, help);
            let _ = writeln!(out, "# TYPE {} counter", name);
            let _ = writeln!(out, "{} {}", name, value);
        }

        let _ = writeln!(out, "# HELP app_uptime_seconds Application uptime in seconds");
        let _ = writeln!(out, "# TYPE app_uptime_seconds gauge");
        let _ = writeln!(out, "app_uptime_seconds {:.2}", self.uptime_seconds());

        let latency = self.latency();
        let _ = writeln!(out, "# HELP app_request_latency_ms Latency of recent requests in milliseconds");
        let _ = writeln!(out, "# TYPE app_request_latency_ms summary");
        for (quantile, value) in [("0.5", latency.p50), ("0.95", latency.p95), ("0.99", latency.p99)] {
            let _ = writeln!(out, "app_request_latency_ms{{quantile=\"{}\"}} {:.3}", quantile, value);
        }
        let _ = writeln!(out, "app_request_latency_ms_count {}", latency.count);

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = Metrics::new(8);
        metrics.record_request(1.0, false);
        metrics.record_request(2.0, true);
        metrics.record_prediction();
        metrics.record_health_check();

        assert_eq!(metrics.total_requests(), 2);
        assert_eq!(metrics.total_errors(), 1);
        assert_eq!(metrics.total_predictions(), 1);
    }

    #[test]
    fn test_latency_window_is_bounded() {
        let metrics = Metrics::new(3);
        for latency in [100.0, 1.0, 2.0, 3.0] {
            metrics.record_request(latency, false);
        }

        let latency = metrics.latency();
        assert_eq!(latency.count, 3);
        assert_eq!(latency.max, 3.0);
        assert_eq!(metrics.total_requests(), 4);
    }

    #[test]
    fn test_render() {
        let metrics = Metrics::new(4);
        metrics.record_request(5.0, false);
        metrics.record_prediction();

        let text = metrics.render();
        assert!(text.contains("# TYPE app_total_requests counter\napp_total_requests 1\n"));
        assert!(text.contains("app_total_predictions 1\n"));
        assert!(text.contains("app_total_errors 0\n"));
        assert!(text.contains("app_request_latency_ms{quantile=\"0.5\"} 5.000\n"));
        assert!(text.contains("app_uptime_seconds "));
    }
}
