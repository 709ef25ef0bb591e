//! Common test utilities and helpers
//!
//! This module provides shared utilities for the server tests including:
//! - In-memory database and router setup
//! - Board and member fixtures
//! - Bearer token helpers
//! - Custom assertion macros

#![allow(dead_code)]

pub mod assertions;
pub mod auth_helpers;
pub mod database;
pub mod fixtures;

// Re-export commonly used utilities
pub use auth_helpers::*;
pub use database::*;
pub use fixtures::*;
