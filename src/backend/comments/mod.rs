//! Comments
//!
//! # Module Structure
//!
//! ```text
//! comments/
//! ├── mod.rs        - Module exports
//! ├── db.rs         - Row mapping, insert, lookups
//! ├── query.rs      - Viewer-scoped query builder
//! ├── ingestion.rs  - Create path: authorization, idempotency, fan-out
//! ├── listing.rs    - Read path: pagination and projection
//! └── handlers.rs   - HTTP handlers
//! ```

pub mod db;
pub mod handlers;
pub mod ingestion;
pub mod listing;
pub mod query;

pub use ingestion::{CommentIngestion, CreateOutcome, RealtimeIngestion};
pub use listing::list_comments_for_viewer;
