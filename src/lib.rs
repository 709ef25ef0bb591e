//! boardsync - Board Messaging Library
//!
//! Members of a board exchange short comments, some restricted to admins,
//! some posted anonymously, with live delivery to connected viewers and
//! gap-free history recovery for disconnected ones.
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared between server and client
//!   - Comment, board and membership models
//!   - Viewer resolution and visibility projection
//!   - Cursors and page shapes
//!   - Channel frames and error types
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Axum HTTP API and WebSocket board channel
//!   - SQLite persistence through sqlx
//!   - Idempotent comment ingestion and per-board fan-out
//!
//! - **`client`** - Native client state (not compiled for WASM)
//!   - Timeline reconciliation of optimistic, pushed and pulled comments
//!   - Channel subscription tracking, send queue, liveness poll
//!   - HTTP API client
//!
//! # Feature Flags
//!
//! - **`ssr`** (default) - enables the `backend` module and the
//!   `boardsync-server` binary
//!
//! # Usage
//!
//! ```rust,no_run
//! # #[cfg(feature = "ssr")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use boardsync::backend::{create_app, ServerConfig};
//!
//! let app = create_app(ServerConfig::from_env()).await?;
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Ordering
//!
//! Comments of a board are totally ordered by `(created_at, id)`. Both the
//! server's pagination and the client's timeline sort by that key.

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;

/// Native board client
/// Only compiled for native targets (not WASM)
#[cfg(not(target_arch = "wasm32"))]
pub mod client;
