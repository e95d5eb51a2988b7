use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{header, HeaderValue, Method, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post, MethodRouter},
    Router,
};
use common::{schema, HealthResponse, InfoResponse, PredictionResponse};
use serde_json::json;
use std::{fmt, time::Instant};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AppError, InferenceError};
use crate::model::Prediction;
use crate::state::{AppState, SharedState};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const PROCESS_TIME_HEADER: &str = "x-process-time";

/// Where a `/predict` request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    Inferred,
    Responded,
    Rejected,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Validated => "validated",
            Stage::Inferred => "inferred",
            Stage::Responded => "responded",
            Stage::Rejected => "rejected",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", allow_only(get(root), "GET"))
        .route("/health", allow_only(get(health), "GET"))
        .route("/info", allow_only(get(info_handler), "GET"))
        .route("/metrics", allow_only(get(metrics_handler), "GET"))
        .route("/predict", allow_only(post(predict), "POST"))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), track_request))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn allow_only(route: MethodRouter<SharedState>, allow: &'static str) -> MethodRouter<SharedState> {
    route.fallback(move |method: Method| async move { AppError::MethodNotAllowed { method, allow } })
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}

/// Tags every response with a request id and its processing time, and feeds
/// the process counters.
async fn track_request(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start_time = Instant::now();

    let mut response = next.run(request).await;

    let elapsed = start_time.elapsed();
    let status = response.status();
    state.metrics.record_request(
        elapsed.as_secs_f64() * 1000.0,
        status.is_client_error() || status.is_server_error(),
    );

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("{:.6}", elapsed.as_secs_f64())) {
        headers.insert(PROCESS_TIME_HEADER, value);
    }

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = status.as_u16(),
        "Request completed in {:.4}s",
        elapsed.as_secs_f64()
    );

    response
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "service": "Rust Model Inference Server",
        "status": "running",
        "endpoints": {
            "health": "/health",
            "info": "/info",
            "metrics": "/metrics",
            "predict": "/predict (POST)"
        }
    }))
}

async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    state.metrics.record_health_check();
    Json(HealthResponse::ok())
}

async fn metrics_handler(State(state): State<SharedState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

async fn info_handler(State(state): State<SharedState>) -> Json<InfoResponse> {
    let memory_rss_mb = {
        let mut system = state.system.lock().await;
        sysinfo::get_current_pid().ok().and_then(|pid| {
            system.refresh_process(pid);
            system
                .process(pid)
                .map(|process| process.memory() as f64 / 1024.0 / 1024.0)
        })
    };

    let loaded = state.provider.loaded();
    let cpu_count = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    Json(InfoResponse {
        framework: "axum".to_string(),
        service_version: env!("CARGO_PKG_VERSION").to_string(),
        model_loaded: loaded.is_some(),
        model: loaded.as_ref().map(|m| m.handle.metadata().clone()),
        model_load_time_ms: loaded.as_ref().map(|m| m.load_time_ms),
        model_load_count: state.provider.load_count(),
        total_requests: state.metrics.total_requests(),
        uptime_seconds: state.metrics.uptime_seconds(),
        cpu_count,
        memory_rss_mb,
    })
}

async fn predict(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<PredictionResponse>, AppError> {
    debug!(stage = %Stage::Received, bytes = body.len(), "Prediction request received");

    let request = schema::parse_body(&body).map_err(|errors| {
        debug!(stage = %Stage::Rejected, errors = errors.len(), "Prediction request rejected");
        AppError::Validation(errors)
    })?;
    debug!(stage = %Stage::Validated, ?request, "Prediction request validated");

    let prediction = infer(&state, request.features()).await.map_err(|e| {
        debug!(stage = %Stage::Failed, "Prediction request failed");
        e
    })?;
    debug!(stage = %Stage::Inferred, label = prediction.label, "Inference complete");

    state.metrics.record_prediction();
    info!(
        "Prediction result: {} probabilities: {:?}",
        prediction.label, prediction.probabilities
    );

    let response = PredictionResponse {
        prediction: prediction.label,
        probabilities: prediction.probabilities,
    };
    debug!(stage = %Stage::Responded, "Prediction response sent");
    Ok(Json(response))
}

async fn infer(state: &AppState, features: [f64; 5]) -> Result<Prediction, AppError> {
    let model = state.provider.get().await?;
    let prediction = tokio::task::spawn_blocking(move || model.predict(&features))
        .await
        .map_err(|e| InferenceError::Aborted(e.to_string()))??;
    Ok(prediction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Received.to_string(), "received");
        assert_eq!(Stage::Rejected.to_string(), "rejected");
        assert_eq!(Stage::Failed.to_string(), "failed");
    }
}
