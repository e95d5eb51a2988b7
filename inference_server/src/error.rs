use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use common::{ErrorKind, ErrorResponse, FieldError};
use std::path::PathBuf;
use tracing::{error, warn};

const INTERNAL_MESSAGE: &str = "Prediction failed due to an internal error";

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("model file not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read model file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model file {} is not a valid model document: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("model file {} is inconsistent: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error("model loading task was aborted: {0}")]
    Aborted(String),
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("input has {actual} features but the model expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("model produced non-finite probabilities {0:?}")]
    NonFinite(Vec<f64>),

    #[error("inference task was aborted: {0}")]
    Aborted(String),
}

/// Everything a request can fail with, mapped onto an HTTP status.
#[derive(Debug)]
pub enum AppError {
    Validation(Vec<FieldError>),
    ModelLoad(ModelLoadError),
    Inference(InferenceError),
    MethodNotAllowed { method: Method, allow: &'static str },
    NotFound(String),
}

impl From<ModelLoadError> for AppError {
    fn from(err: ModelLoadError) -> Self {
        AppError::ModelLoad(err)
    }
}

impl From<InferenceError> for AppError {
    fn from(err: InferenceError) -> Self {
        AppError::Inference(err)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ModelLoad(_) | AppError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::Validation(detail) => {
                warn!(errors = detail.len(), "Rejected prediction request");
                ErrorResponse::validation(detail.clone())
            }
            // Full detail stays in the server log; callers get a generic message.
            AppError::ModelLoad(err) => {
                error!("Model unavailable: {}", err);
                ErrorResponse::message(ErrorKind::Server, INTERNAL_MESSAGE, "internal_error")
            }
            AppError::Inference(err) => {
                error!("Inference failed: {}", err);
                ErrorResponse::message(ErrorKind::Server, INTERNAL_MESSAGE, "internal_error")
            }
            AppError::MethodNotAllowed { method, allow } => ErrorResponse::message(
                ErrorKind::Routing,
                format!("Method {} not allowed, use {}", method, allow),
                "method_not_allowed",
            ),
            AppError::NotFound(path) => ErrorResponse::message(
                ErrorKind::Routing,
                format!("No endpoint at {}", path),
                "not_found",
            ),
        };

        let mut response = (status, Json(body)).into_response();
        if let AppError::MethodNotAllowed { allow, .. } = self {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static(allow));
        }
        response
    }
}
