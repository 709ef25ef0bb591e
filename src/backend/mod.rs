//! Backend Module
//!
//! Server-side code: the comment HTTP API, the realtime board channel and
//! their persistence. Only compiled with the `ssr` feature.
//!
//! # Architecture
//!
//! - **`server`** - configuration, application state, initialization
//! - **`routes`** - router assembly
//! - **`comments`** - create and list paths for comments
//! - **`boards`** - board and membership store, viewer resolution
//! - **`realtime`** - per-board broadcast channels and the `/ws` socket
//! - **`auth`** - bearer tokens
//! - **`middleware`** - the `Viewer` extractor
//! - **`error`** - `BackendError` and its HTTP mapping
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs
//! ├── main.rs         - boardsync-server binary
//! ├── server/
//! ├── routes/
//! ├── comments/
//! ├── boards/
//! ├── realtime/
//! ├── auth/
//! ├── middleware/
//! ├── error/
//! └── storage.rs      - column decoding helpers
//! ```
//!
//! # Concurrency
//!
//! Each request runs its own transaction against the pool; no lock is held
//! across requests. The only contention point is the unique index on
//! `(board_id, client_id)`, resolved by catching the violation and
//! re-reading. Fan-out goes through `tokio::sync::broadcast` and never
//! blocks the write path.

/// Server setup and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// Comment create and list paths
pub mod comments;

/// Boards and memberships
pub mod boards;

/// Realtime board channels
pub mod realtime;

/// Backend error types
pub mod error;

/// Bearer tokens
pub mod auth;

/// Request extractors
pub mod middleware;

/// Column decoding helpers
pub mod storage;

pub use error::BackendError;
pub use server::{create_app, AppState, ServerConfig};
