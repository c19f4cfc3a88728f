use gl_mcp::{
    config::Settings,
    mcp::session::spawn_idle_reaper,
    providers::register_all_providers,
    routes, AppState,
};

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = settings.bind_addr()?;
    let app_state = AppState::from_settings(settings)?;

    if let Some(header) = &app_state.settings.roles_header {
        tracing::info!(header = %header, "Session roles read from request header");
    }

    // Providers
    register_all_providers(&app_state.providers, &app_state.settings);
    let results = app_state
        .providers
        .initialize_all(app_state.settings.provider_roles.as_deref())
        .await;
    for (provider, available) in &results {
        tracing::info!(provider = %provider, available, "Provider status");
    }
    tracing::info!(tools = app_state.tools.len(), "Tool registry ready");

    // Idle session expiry
    let shutdown = CancellationToken::new();
    let reaper = app_state.settings.session_idle_timeout.map(|ttl| {
        tracing::info!(ttl_secs = ttl.as_secs(), "Idle session expiry enabled");
        spawn_idle_reaper(app_state.sessions.clone(), ttl, shutdown.child_token())
    });

    let sessions = app_state.sessions.clone();
    let app = routes::build_router(app_state);

    tracing::info!("Server running on http://{}", addr);
    tracing::info!("MCP endpoint: http://{}/mcp", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutting down");
            // Open event streams end with their sessions
            sessions.close_all();
            shutdown.cancel();
        })
        .await?;

    if let Some(reaper) = reaper {
        reaper.await.ok();
    }

    Ok(())
}
