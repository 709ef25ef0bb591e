//! Route configuration

/// Main router assembly
pub mod router;

pub use router::create_router;
