/**
 * Application State Management
 *
 * `AppState` is the central state container handed to every handler.
 * `FromRef` implementations let handlers extract only the part they need.
 *
 * # Contents
 *
 * - the SQLite pool
 * - the connection registry with its per-board broadcast channels
 * - the comment ingestion pipeline
 * - the server configuration
 *
 * # Example
 *
 * ```rust,ignore
 * use axum::extract::State;
 * use sqlx::SqlitePool;
 *
 * async fn handler(State(pool): State<SqlitePool>) {
 *     // query the store
 * }
 * ```
 */

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::backend::comments::ingestion::{CommentIngestion, RealtimeIngestion};
use crate::backend::realtime::ConnectionManager;
use crate::backend::server::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub pool: SqlitePool,

    /// Open sockets and per-board broadcast channels
    pub connections: ConnectionManager,

    /// Create path for comments: validation, idempotent insert, fan-out
    pub ingestion: Arc<dyn CommentIngestion>,

    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wire the default ingestion pipeline over a pool
    pub fn new(pool: SqlitePool, config: ServerConfig) -> Self {
        let connections = ConnectionManager::new(config.channel_capacity);
        let ingestion = Arc::new(RealtimeIngestion::new(pool.clone(), connections.clone()));
        Self {
            pool,
            connections,
            ingestion,
            config: Arc::new(config),
        }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.pool.clone()
    }
}

impl FromRef<AppState> for ConnectionManager {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.connections.clone()
    }
}

impl FromRef<AppState> for Arc<dyn CommentIngestion> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.ingestion.clone()
    }
}

impl FromRef<AppState> for Arc<ServerConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.config.clone()
    }
}
