//! Boards and memberships
//!
//! - **`db`** - store functions for users, boards and memberships
//! - **`access`** - viewer context resolution

pub mod access;
pub mod db;

pub use access::{require_active_member, resolve_viewer, resolve_viewer_by_code};
