//! HTTP server setup for the component registry.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::{config::Config, handlers, state::AppState, validation};

/// Build the application router over `state`.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_request_body_size_bytes();

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/index", get(handlers::get_index))
        .route("/api/index/rebuild", post(handlers::rebuild_index))
        .route("/api/components/{name}", get(handlers::fetch_component))
        .route(
            "/api/components/{name}/{host_version}/{component_version}",
            post(handlers::publish_component),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Serve the registry on `host:port` until the process is stopped.
pub async fn run_server(host: String, port: u16, config: Config) -> Result<()> {
    validation::validate_hostname(&host).map_err(|e| {
        error!(host = %host, error = %e, "Invalid host parameter");
        anyhow::anyhow!("Invalid host parameter: {e}")
    })?;

    if config.storage.backend == crate::config::BackendKind::Local {
        std::fs::create_dir_all(&config.storage.data_dir)?;
        info!(data_dir = %config.storage.data_dir.display(), "Using data directory");
    }

    let state = AppState::from_config(config);
    info!(backend = state.registry.backend_name(), "Storage backend ready");
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse().map_err(|e| {
        error!(host = %host, port = %port, error = %e, "Invalid socket address");
        anyhow::anyhow!("Invalid socket address {}:{}: {}", host, port, e)
    })?;

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        error!(addr = %addr, error = %e, "Failed to bind to address");
        anyhow::anyhow!("Failed to bind to {}:{}: {}", host, port, e)
    })?;

    println!("✅ Component registry is running on http://{}:{}", host, port);
    println!();
    println!("📋 Quick commands:");
    println!("   Health:     curl http://localhost:{}/health", port);
    println!("   Index:      curl http://localhost:{}/api/index", port);

    info!("Server listening on {}", addr);
    axum::serve(listener, app).await.map_err(|e| {
        error!(error = %e, "Server error");
        anyhow::anyhow!("Server error: {}", e)
    })?;

    Ok(())
}
