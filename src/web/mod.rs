//! Web layer
//!
//! Thin HTTP surface over the export pipeline and registry. Handlers parse
//! and delegate; all business decisions live in the service layer, and every
//! error reaches the client through one shared envelope.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::services::{ExportPipeline, ExportRegistry};

pub mod handlers;
pub mod openapi;
pub mod responses;

pub use responses::{handle_error, ApiResponse};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ExportPipeline>,
    pub registry: Arc<ExportRegistry>,
    /// External base URL used when building download links
    pub base_url: String,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(config: &Config, pipeline: Arc<ExportPipeline>) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;
        let registry = pipeline.registry().clone();
        let state = AppState {
            pipeline,
            registry,
            base_url: config.web.base_url.trim_end_matches('/').to_string(),
            start_time: chrono::Utc::now(),
        };
        Ok(Self {
            app: build_router(state),
            addr,
        })
    }

    /// The assembled router, for in-process testing without a socket.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// Serve until SIGTERM/SIGINT, then shut down gracefully.
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        tracing::info!("Listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

/// Assemble the full route table with shared state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/v1/export/{export_type}",
            post(handlers::export::create_export),
        )
        .route(
            "/api/v1/export/{export_id}/status",
            get(handlers::export::export_status),
        )
        .route(
            "/api/v1/export/{export_id}/download",
            get(handlers::export::download_export),
        )
        .route(
            "/api/v1/export/{export_id}/download/batch/{chunk}",
            get(handlers::export::download_chunk),
        )
        .route("/api/v1/cleanup", post(handlers::admin::run_cleanup))
        .route("/api/v1/storage/info", get(handlers::admin::storage_info))
        .route("/health", get(handlers::health::health_check))
        .route("/live", get(handlers::health::liveness))
        .route("/api/openapi.json", get(openapi::serve_openapi))
        .layer(CorsLayer::permissive())
        // Bulk inline record sets blow through axum's 2MB default
        .layer(axum::extract::DefaultBodyLimit::max(64 * 1024 * 1024))
        .with_state(state)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                return std::future::pending::<()>().await;
            }
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(err) => {
                tracing::error!("Failed to install SIGINT handler: {}", err);
                return std::future::pending::<()>().await;
            }
        };
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, shutting down gracefully");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, shutting down gracefully");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", err);
            return std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down gracefully");
    }
}
