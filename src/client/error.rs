//! Client error types.
//!
//! Failures split into terminal ones, which are shown to the user, and
//! transient ones, which the send queue retries.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The server refused the request (401, 403, 400, ...)
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Board not found")]
    NotFound,

    /// Connection refused, reset, 5xx and the like
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error("Not authenticated")]
    NotAuthenticated,
}

impl ClientError {
    /// Whether retrying the same request could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::Timeout)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_transient()
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ClientError::Timeout.is_transient());
        assert!(ClientError::Transport("reset".into()).is_transient());
        assert!(ClientError::NotFound.is_terminal());
        assert!(ClientError::Rejected { status: 403, message: "no".into() }.is_terminal());
    }
}
