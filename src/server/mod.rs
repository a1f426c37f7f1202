//! Penguin Classifier Server Module
//!
//! HTTP surface for the inference service: a welcome route, a health check
//! reporting readiness and model source, and single-record prediction.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::{FieldError, ServerError};
pub use handlers::{parse_features, ValidatedFeatures, WELCOME_MESSAGE};
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::inference::InferenceService;
use crate::loader::{self, LoaderConfig};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub loader: LoaderConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            loader: LoaderConfig::from_env(),
        }
    }
}

/// Load the model, then serve until ctrl+c.
///
/// The load sequence finishes before the listener is bound. A failed load
/// still starts the server, which then answers `/predict` with 503.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    info!(
        remote_configured = config.loader.remote.is_configured(),
        model_path = %config.loader.local.model_path.display(),
        metadata_path = %config.loader.local.metadata_path.display(),
        started_at = %start_time.to_rfc3339(),
        "Resolving model"
    );

    let outcome = loader::resolve(&config.loader).await;
    let service = InferenceService::from_outcome(outcome);
    if !service.is_ready() {
        warn!("No model loaded, /predict will return 503 until restart");
    }

    let state = Arc::new(AppState::new(service));
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        address = %addr,
        pid = std::process::id(),
        "Penguin classifier listening"
    );
    info!(url = %format!("http://{}/health", addr), "Health endpoint available");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl+c, shutting down");
        }
        let stop_time = chrono::Utc::now();
        let uptime = stop_time.signed_duration_since(start_time);
        info!(
            stopped_at = %stop_time.to_rfc3339(),
            uptime_secs = uptime.num_seconds(),
            "Shutdown signal received, stopping server gracefully"
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        if std::env::var("API_PORT").is_err() {
            assert_eq!(config.port, 8080);
        }
        if std::env::var("API_HOST").is_err() {
            assert_eq!(config.host, "0.0.0.0");
        }
    }
}
