//! Server Module
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs          - Module exports
//! ├── state.rs        - AppState and FromRef implementations
//! ├── config.rs       - Environment configuration and database loading
//! └── init.rs         - Server initialization and app creation
//! ```

/// Application state management
pub mod state;

/// Server configuration loading
pub mod config;

/// Server initialization
pub mod init;

pub use config::ServerConfig;
pub use init::create_app;
pub use state::AppState;
