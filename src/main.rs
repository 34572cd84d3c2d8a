// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::application::card_generator::CardGenerator;
use crate::application::dashboard_service::DashboardService;
use crate::application::dashboard_store::DashboardStore;
use crate::application::drag_controller::DragController;
use crate::application::events::EventBus;
use crate::application::explore_service::ExploreService;
use crate::application::refresh_scheduler::RefreshScheduler;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::http_generator::HttpCardGenerator;
use crate::presentation::app_state::AppState;
use crate::presentation::router::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = load_app_config()?;

    // Initialize tracing; RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Card generation client (infrastructure layer)
    let generator: Arc<dyn CardGenerator> = Arc::new(HttpCardGenerator::new(&config.generation)?);

    // Shared canvas state and services (application layer)
    let store = DashboardStore::new(EventBus::new());
    let scheduler = RefreshScheduler::new(store.clone(), generator.clone());
    let dashboards = DashboardService::new(store.clone(), scheduler, generator);

    let state = Arc::new(AppState {
        drag: DragController::new(store),
        explore: ExploreService::with_seed_catalog(dashboards.clone()),
        dashboards,
    });

    // Build router (presentation layer)
    let router = build_router(state);

    // Start server
    let addr = config.server.socket_addr()?;
    tracing::info!(%addr, endpoint = %config.generation.endpoint, "Starting dashboard-canvas service");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
