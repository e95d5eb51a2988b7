use serde::{Deserialize, Serialize};

use crate::schema::FieldError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: i64,
    /// One entry per class the model was trained on, in class order.
    pub probabilities: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller sent a body that does not match the request schema.
    Validation,
    /// Unknown path or unsupported method.
    Routing,
    /// Anything that went wrong on our side.
    Server,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub detail: Vec<FieldError>,
}

impl ErrorResponse {
    pub fn validation(detail: Vec<FieldError>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            detail,
        }
    }

    pub fn message(kind: ErrorKind, msg: impl Into<String>, error_type: &str) -> Self {
        Self {
            kind,
            detail: vec![FieldError::new(&[], msg, error_type)],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub version: String,
    pub path: String,
    pub features: Vec<String>,
    pub classes: Vec<i64>,
    pub class_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub framework: String,
    pub service_version: String,
    pub model_loaded: bool,
    pub model: Option<ModelInfo>,
    pub model_load_time_ms: Option<f64>,
    pub model_load_count: u64,
    pub total_requests: u64,
    pub uptime_seconds: f64,
    pub cpu_count: usize,
    pub memory_rss_mb: Option<f64>,
}
