pub mod config;
pub mod http;
pub mod schema;
pub mod stats;

pub use config::ServerConfig;
pub use http::{ErrorKind, ErrorResponse, HealthResponse, InfoResponse, ModelInfo, PredictionResponse};
pub use schema::{FieldError, PredictionRequest, FEATURE_NAMES};
pub use stats::Statistics;
