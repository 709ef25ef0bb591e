//! Comment Types
//!
//! A comment is an immutable message posted to a board. Once stored, its
//! content, visibility and anonymity never change.
//!
//! # Types
//!
//! - [`Comment`] - the stored record, exactly as persisted
//! - [`AuthoredComment`] - a stored record joined with its author's display name
//! - [`NewComment`] - the create request a client submits
//! - [`CommentView`] - what a particular viewer is allowed to see of a comment
//!
//! `CommentView` is only ever produced by [`crate::shared::visibility::project`];
//! nothing else decides which sender label a viewer gets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::SharedError;

/// Label shown in place of the author for anonymous comments.
pub const ANONYMOUS_LABEL: &str = "Anonymous";

/// Longest board-activity preview, in characters.
pub const PREVIEW_MAX_CHARS: usize = 140;

/// Longest accepted comment body, in characters, after trimming.
pub const MAX_CONTENT_CHARS: usize = 2000;

/// Who may read a comment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    /// Every member of the board
    Everyone,
    /// Board admins and the comment's author
    AdminOnly,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Everyone => "EVERYONE",
            Visibility::AdminOnly => "ADMIN_ONLY",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "EVERYONE" => Some(Visibility::Everyone),
            "ADMIN_ONLY" => Some(Visibility::AdminOnly),
            _ => None,
        }
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::Everyone
    }
}

/// A stored comment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: Uuid,
    pub board_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub visibility: Visibility,
    pub anonymous: bool,
    /// Client-supplied idempotency token, unique per board when present
    pub client_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Truncated preview used for board activity summaries.
    pub fn preview(&self) -> String {
        preview(&self.content)
    }
}

/// A stored comment together with the author's current display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthoredComment {
    pub comment: Comment,
    pub author_name: String,
}

/// Create-comment request body.
///
/// `client_message_id` is the idempotency token: resubmitting the same
/// token for the same board returns the already-stored comment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub board_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub anonymous: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_message_id: Option<String>,
}

impl NewComment {
    pub fn new(board_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            board_id,
            content: content.into(),
            visibility: Visibility::Everyone,
            anonymous: false,
            client_message_id: None,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn anonymous(mut self, anonymous: bool) -> Self {
        self.anonymous = anonymous;
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_message_id = Some(client_id.into());
        self
    }

    /// Trim the body and check it against the length limits.
    ///
    /// Returns the trimmed content. Empty client tokens are treated as absent.
    pub fn normalized(&self) -> Result<(String, Option<String>), SharedError> {
        let content = validate_content(&self.content)?;
        let client_id = self
            .client_message_id
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string);
        Ok((content, client_id))
    }
}

/// Per-viewer projection of a comment.
///
/// `sender` is the label this viewer should display. `actual_sender` is only
/// present when the comment is anonymous and the viewer is allowed to see
/// through it. `sender_id` is withheld whenever the sender is masked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub board_id: Uuid,
    #[serde(rename = "message")]
    pub text: String,
    pub visibility: Visibility,
    #[serde(rename = "sender")]
    pub displayed_sender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<Uuid>,
    pub anonymous: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_message_id: Option<String>,
}

/// Trim and length-check a comment body.
pub fn validate_content(content: &str) -> Result<String, SharedError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(SharedError::validation("content", "Comment content cannot be empty"));
    }
    let chars = trimmed.chars().count();
    if chars > MAX_CONTENT_CHARS {
        return Err(SharedError::validation(
            "content",
            format!("Comment content is {} characters, limit is {}", chars, MAX_CONTENT_CHARS),
        ));
    }
    Ok(trimmed.to_string())
}

/// Character-safe preview no longer than [`PREVIEW_MAX_CHARS`].
pub fn preview(content: &str) -> String {
    if content.chars().count() <= PREVIEW_MAX_CHARS {
        return content.to_string();
    }
    let mut out: String = content.chars().take(PREVIEW_MAX_CHARS - 3).collect();
    out.push_str("...");
    out
}
