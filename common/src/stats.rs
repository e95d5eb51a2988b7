use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Distribution, Max, OrderStatistics};

/// Latency summary in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statistics {
    pub count: usize,
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub max: f64,
}

impl Statistics {
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::zeros();
        }

        let mut data = Data::new(samples.to_vec());

        Self {
            count: samples.len(),
            mean: data.mean().unwrap_or(0.0),
            p50: data.quantile(0.50),
            p95: data.quantile(0.95),
            p99: data.quantile(0.99),
            max: data.max(),
        }
    }

    pub fn zeros() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            p50: 0.0,
            p95: 0.0,
            p99: 0.0,
            max: 0.0,
        }
    }
}
