/**
 * Server Initialization
 *
 * # Initialization Process
 *
 * 1. Open the database and run migrations
 * 2. Build `AppState` (connection registry, ingestion pipeline)
 * 3. Create the router
 * 4. Start the periodic cleanup of idle board channels
 */

use axum::Router;

use crate::backend::realtime::ConnectionManager;
use crate::backend::routes::router::create_router;
use crate::backend::server::config::{load_database, ServerConfig};
use crate::backend::server::state::AppState;

/// Build the application state from configuration
pub async fn build_state(config: ServerConfig) -> Result<AppState, sqlx::Error> {
    let pool = load_database(&config).await?;
    Ok(AppState::new(pool, config))
}

/// Create and configure the Axum application
pub async fn create_app(config: ServerConfig) -> Result<Router<()>, sqlx::Error> {
    tracing::info!("Initializing boardsync server");

    let cleanup_interval = config.cleanup_interval;
    let app_state = build_state(config).await?;
    let app = create_router(app_state.clone());

    spawn_channel_cleanup(app_state.connections.clone(), cleanup_interval);
    tracing::info!("Router configured with periodic cleanup task");

    Ok(app)
}

/// Periodically drop board channels nobody listens to
pub fn spawn_channel_cleanup(
    connections: ConnectionManager,
    every: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let removed = connections.cleanup_inactive_channels();
            tracing::debug!("[Realtime] Cleaned up {} inactive board channels", removed);
        }
    })
}
