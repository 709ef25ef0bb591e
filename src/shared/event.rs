/**
 * Board Channel Frames
 *
 * Wire format of the realtime board channel. Every frame is a JSON object
 * `{"event": <name>, "data": <payload>}`.
 *
 * Client to server:
 * - `join-board {boardCode, name}`
 * - `leave-board {boardCode}`
 *
 * Server to client:
 * - `joined-room {boardCode}`
 * - `receive-message {boardCode, id, message, visibility, sender, ...}`
 * - `message:ack {boardCode, clientId, id, createdAt}`
 * - `board-activity {boardCode, lastActivity, lastCommentPreview, ...}`
 * - `error {message}`
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::comment::{CommentView, Visibility};
use crate::shared::error::SharedError;

/// Frames a client sends on the board channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum ClientFrame {
    #[serde(rename = "join-board")]
    JoinBoard(JoinBoard),
    #[serde(rename = "leave-board")]
    LeaveBoard(BoardRef),
}

/// Frames the server pushes on the board channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum ServerFrame {
    #[serde(rename = "joined-room")]
    JoinedRoom(BoardRef),
    #[serde(rename = "receive-message")]
    ReceiveMessage(MessagePayload),
    #[serde(rename = "message:ack")]
    MessageAck(AckPayload),
    #[serde(rename = "board-activity")]
    BoardActivity(ActivityPayload),
    #[serde(rename = "error")]
    Error(ErrorPayload),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JoinBoard {
    pub board_code: String,
    /// Display name the client joins under
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BoardRef {
    pub board_code: String,
}

/// A new comment, already projected for the receiving subscriber
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    pub board_code: String,
    #[serde(flatten)]
    pub comment: CommentView,
}

/// Confirms a create request identified by its idempotency token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AckPayload {
    pub board_code: String,
    pub client_id: String,
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Updated last-activity summary of a board
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPayload {
    pub board_code: String,
    pub board_id: Uuid,
    pub last_activity: DateTime<Utc>,
    pub last_comment_preview: String,
    pub last_comment_visibility: Visibility,
    pub last_comment_anonymous: bool,
    /// Sender label as this subscriber would see it
    pub last_sender: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    /// Board whose join was rejected, when the error concerns one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_code: Option<String>,
    pub message: String,
}

impl ClientFrame {
    pub fn join(board_code: impl Into<String>, name: impl Into<String>) -> Self {
        ClientFrame::JoinBoard(JoinBoard {
            board_code: board_code.into(),
            name: name.into(),
        })
    }

    pub fn leave(board_code: impl Into<String>) -> Self {
        ClientFrame::LeaveBoard(BoardRef {
            board_code: board_code.into(),
        })
    }

    pub fn parse(text: &str) -> Result<Self, SharedError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, SharedError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl ServerFrame {
    pub fn joined(board_code: impl Into<String>) -> Self {
        ServerFrame::JoinedRoom(BoardRef {
            board_code: board_code.into(),
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerFrame::Error(ErrorPayload {
            board_code: None,
            message: message.into(),
        })
    }

    pub fn join_rejected(board_code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerFrame::Error(ErrorPayload {
            board_code: Some(board_code.into()),
            message: message.into(),
        })
    }

    pub fn parse(text: &str) -> Result<Self, SharedError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, SharedError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Wire name of the frame, for logging
    pub fn name(&self) -> &'static str {
        match self {
            ServerFrame::JoinedRoom(_) => "joined-room",
            ServerFrame::ReceiveMessage(_) => "receive-message",
            ServerFrame::MessageAck(_) => "message:ack",
            ServerFrame::BoardActivity(_) => "board-activity",
            ServerFrame::Error(_) => "error",
        }
    }
}
