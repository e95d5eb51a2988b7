use anyhow::{Context, Result};
use common::ServerConfig;
use inference_server::{router, AppState};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("inference_server=info,tower_http=info")),
        )
        .init();

    info!("======================================================================");
    info!("Model Inference Server - Starting");
    info!("======================================================================");

    let config = ServerConfig::from_env().context("Failed to load configuration")?;
    info!("Model path: {}", config.model_path.display());

    let state = AppState::new(config.clone());

    if config.preload_model {
        if let Err(e) = state.provider.get().await {
            error!("Critical error: {}", e);
            error!("Application cannot start without the model. Shutting down.");
            return Err(e).context("Model preload failed");
        }
    } else {
        info!("Model will be loaded on the first /predict request");
    }

    let app = router(state.clone());

    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    info!("Server ready on http://{}", bind_address);
    info!("======================================================================");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Application shutting down...");
    state.provider.reset();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
