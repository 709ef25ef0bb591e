/**
 * Router Configuration
 *
 * # Routes
 *
 * - `POST /comments` - create a comment
 * - `GET /comments/{board_id}` - list comments (cursor, before, since, offset)
 * - `GET /ws` - board channel WebSocket
 * - `GET /health` - liveness probe
 *
 * Every request is traced through `tower-http`'s `TraceLayer`.
 */

use axum::{routing::get, routing::post, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::backend::comments::handlers::{create_comment, list_comments};
use crate::backend::realtime::handle_board_socket;
use crate::backend::server::state::AppState;

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router<()> {
    Router::new()
        .route("/comments", post(create_comment))
        .route("/comments/{board_id}", get(list_comments))
        .route("/ws", get(handle_board_socket))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

async fn health() -> &'static str {
    "ok"
}
