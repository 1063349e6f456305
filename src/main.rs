// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::plot_orchestrator::PlotOrchestrator;
use crate::application::workflow_service::WorkflowService;
use crate::infrastructure::config::load_workbench_config;
use crate::infrastructure::http_compute_client::HttpComputeClient;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    clear_all, export_statistics, health_check, plot_events, plot_slot, process, select_file,
    session, set_mode, statistics, update_params, upload_files,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("signal_workbench=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let config = load_workbench_config()?;

    // Create the compute client (infrastructure layer)
    let timeout = config.service.request_timeout();
    let client = Arc::new(HttpComputeClient::new(
        config.service.base_url.clone(),
        timeout,
    )?);

    // Create services (application layer)
    let orchestrator = PlotOrchestrator::new(client.clone(), timeout);
    let workflow = WorkflowService::new(client, orchestrator, config.defaults.to_params());

    let state = Arc::new(AppState { workflow });

    // Build router (presentation layer)
    let app = router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server.bind_addr.parse()?;
    tracing::info!(
        "Starting signal-workbench on {} (compute service at {})",
        addr,
        config.service.base_url
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/session", get(session))
        .route("/files", post(upload_files).delete(clear_all))
        .route("/files/selected", put(select_file))
        .route("/params", put(update_params))
        .route("/process", post(process))
        .route("/plots/events", get(plot_events))
        .route("/plots/:kind", get(plot_slot))
        .route("/plots/:kind/mode", put(set_mode))
        .route("/statistics", get(statistics))
        .route("/statistics/export", get(export_statistics))
        .with_state(state)
}
