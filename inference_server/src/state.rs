use common::ServerConfig;
use std::sync::Arc;
use sysinfo::System;

use crate::metrics::Metrics;
use crate::provider::ModelProvider;

pub type SharedState = Arc<AppState>;

// Application state
pub struct AppState {
    pub config: ServerConfig,
    pub provider: ModelProvider,
    pub metrics: Metrics,
    pub system: tokio::sync::Mutex<System>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> SharedState {
        Arc::new(Self {
            provider: ModelProvider::new(config.model_path.clone()),
            metrics: Metrics::new(config.latency_window),
            system: tokio::sync::Mutex::new(System::new()),
            config,
        })
    }
}
