/**
 * Backend Error Types
 *
 * The single error type returned by handlers, the ingestion pipeline and
 * the channel join path. Each variant maps to one HTTP status.
 *
 * # Error Categories
 *
 * ## Authorization
 *
 * - `Unauthorized` - no viewer could be identified from the request
 * - `NotAMember` - the viewer has no membership row for the board
 * - `Forbidden` - role, visibility or anonymity policy violation
 *
 * ## Lookup
 *
 * - `NotFound` - the board (or invite code) does not exist
 *
 * ## Input
 *
 * - `SharedError` - validation failures detected before any store access
 *
 * ## Infrastructure
 *
 * - `Database` - store failures
 * - `SerializationError` - JSON failures
 *
 * Idempotency races never show up here: a unique violation on
 * `(board_id, client_id)` is resolved by re-reading the winning row.
 */

use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::shared::membership::NotAMember;
use crate::shared::SharedError;

/// Backend-specific error types
#[derive(Debug, Error)]
pub enum BackendError {
    /// Missing or invalid credentials
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Human-readable error message
        message: String,
    },

    /// Viewer is not a member of the board
    #[error("Not a member of board {board_id}")]
    NotAMember {
        /// Board the viewer tried to access
        board_id: Uuid,
    },

    /// Policy violation
    #[error("Forbidden: {reason}")]
    Forbidden {
        /// Which rule was violated
        reason: String,
    },

    /// Missing resource
    #[error("{what} not found")]
    NotFound {
        /// What was being looked up
        what: String,
    },

    /// Shared error (validation, serialization)
    #[error(transparent)]
    SharedError(#[from] SharedError),

    /// Store failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl BackendError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Get the HTTP status code for this error
    ///
    /// # Status Code Mapping
    ///
    /// - `Unauthorized` - 401
    /// - `NotAMember`, `Forbidden` - 403
    /// - `NotFound` - 404
    /// - `SharedError` - 400 for validation, 500 for serialization
    /// - `Database`, `SerializationError` - 500
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::NotAMember { .. } | Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::SharedError(err) => match err {
                SharedError::ValidationError { .. } => StatusCode::BAD_REQUEST,
                SharedError::SerializationError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Database(_) | Self::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error message
    ///
    /// Store and serialization details stay in the logs.
    pub fn message(&self) -> String {
        match self {
            Self::Database(_) => "Internal server error".to_string(),
            Self::SerializationError(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<NotAMember> for BackendError {
    fn from(err: NotAMember) -> Self {
        Self::NotAMember {
            board_id: err.board_id,
        }
    }
}
