//! Prediction server
//!
//! Thin HTTP layer over the immutable inference engine. The server refuses
//! to start when either artifact is missing or corrupt.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use state::AppState;

use crate::inference::InferenceEngine;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub preprocessor_path: PathBuf,
    pub model_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            preprocessor_path: std::env::var("PREPROCESSOR_PATH")
                .unwrap_or_else(|_| "models/preprocessor.json".to_string())
                .into(),
            model_path: std::env::var("MODEL_PATH")
                .unwrap_or_else(|_| "models/model.json".to_string())
                .into(),
        }
    }
}

/// Start the server with the given configuration.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    // Artifact problems abort startup before the socket is bound
    let engine = InferenceEngine::load(&config.preprocessor_path, &config.model_path)?;
    let state = Arc::new(AppState::new(engine));
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        host = %config.host,
        port = config.port,
        "loanflow prediction server starting"
    );
    info!(url = %format!("http://{}/api/health", addr), "Health endpoint available");
    info!(url = %format!("http://{}/api/predict", addr), "Prediction endpoint available");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening");

    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Shutdown signal received, stopping server");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}
