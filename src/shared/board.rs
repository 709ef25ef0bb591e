//! Board Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::comment::Visibility;

/// A board: a named group whose members post comments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: Uuid,
    pub name: String,
    /// Short code used to join the board's realtime channel
    pub invite_code: String,
    pub creator_id: Uuid,
    /// Whether non-admin members may post anonymously
    pub anonymous_enabled: bool,
    pub last_activity: Option<LastActivity>,
}

/// Summary of the most recent comment on a board.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LastActivity {
    pub at: DateTime<Utc>,
    pub preview: String,
    pub visibility: Visibility,
    pub anonymous: bool,
    pub sender_id: Uuid,
}
