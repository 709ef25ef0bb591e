//! Shared Module
//!
//! Types and pure rules shared between the server and the client.
//!
//! # Overview
//!
//! - Data model: boards, memberships, comments
//! - The membership context resolver and the visibility projector, which
//!   both sides apply identically
//! - Cursor pagination types
//! - Board channel wire frames

/// Comment model and create requests
pub mod comment;

/// Board model
pub mod board;

/// Memberships and viewer context resolution
pub mod membership;

/// Per-viewer visibility projection
pub mod visibility;

/// Pagination cursors and page types
pub mod cursor;

/// Board channel frames
pub mod event;

/// Microsecond timestamp helpers
pub mod clock;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

pub use board::{Board, LastActivity};
pub use comment::{AuthoredComment, Comment, CommentView, NewComment, Visibility};
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use cursor::{CommentPage, Cursor, ListCommentsQuery, PageRequest, Window};
pub use error::SharedError;
pub use event::{ClientFrame, ServerFrame};
pub use membership::{Membership, MembershipStatus, NotAMember, Role, ViewerContext};
