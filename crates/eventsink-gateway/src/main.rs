//! eventsink gateway
//!
//! - `POST /events`, `GET /events`: in-memory event ingestion
//! - `GET /healthz`, `GET /metrics`: operational endpoints
//! - Graceful shutdown on SIGINT/SIGTERM with a bounded grace period

use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eventsink_core::EventStore;
use eventsink_gateway::{
    app_state::AppState,
    config,
    lifecycle::{self, Server},
    obs::HttpMetrics,
    router,
};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = match config::load_from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "config load failed");
            return ExitCode::FAILURE;
        }
    };

    let metrics = Arc::new(HttpMetrics::new());
    let state = AppState::new(cfg.clone(), Arc::new(EventStore::new()), metrics);
    let app = router::build_router(state);

    let server = match Server::bind(cfg.listen).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, listen = %cfg.listen, "failed to bind listener");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(listen = %cfg.listen, "eventsink-gateway starting");

    let shutdown = CancellationToken::new();
    let running = server.spawn(app, shutdown.clone());

    lifecycle::shutdown_signal(shutdown).await;
    running.shutdown(cfg.shutdown_grace).await;

    ExitCode::SUCCESS
}
