use dashboard_frontend::config::get_configuration;
use dashboard_frontend::middleware::gate::RouteGate;
use dashboard_frontend::services::identity_client::IdentityClient;
use dashboard_frontend::session::{provider::IdentityProvider, SessionLifecycle};
use dashboard_frontend::startup::build_router;
use dashboard_frontend::AppState;
use dotenvy::dotenv;
use service_core::observability::logging::init_tracing;
use service_core::observability::metrics::init_metrics;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "dashboard-frontend",
        "info",
        configuration.server.otlp_endpoint.as_deref(),
    );
    init_metrics();

    let identity_client = Arc::new(IdentityClient::new(configuration.identity_service.clone()));
    let profile_timeout = Duration::from_millis(configuration.identity_service.profile_timeout_ms);
    let session = Arc::new(
        SessionLifecycle::mount(
            identity_client.clone() as Arc<dyn IdentityProvider>,
            profile_timeout,
        )
        .await,
    );
    let route_gate = Arc::new(RouteGate::from_settings(&configuration.route_gate));

    let app = build_router(AppState::new(identity_client, session.clone(), route_gate));

    let address = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );
    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!("Starting dashboard-frontend on {}", address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            tracing::error!("Server error: {}", e);
            anyhow::anyhow!("Server error: {}", e)
        })?;

    session.unmount().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
