/**
 * Board Event Broadcasting
 *
 * Events published on a board's broadcast channel. An event carries the
 * stored comment, not a rendered frame: every subscriber renders it with
 * its own viewer context, so an `ADMIN_ONLY` comment never leaves the
 * server towards a member who may not see it, and anonymous senders are
 * masked exactly as the list endpoint masks them.
 *
 * # Event Types
 *
 * - `Message` - a freshly created comment (`receive-message`)
 * - `Activity` - the board's updated last-activity summary (`board-activity`)
 *
 * Acknowledgements are addressed to the author's connections directly and
 * do not travel on the board channel.
 */

use std::sync::Arc;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::shared::comment::AuthoredComment;
use crate::shared::event::{ActivityPayload, MessagePayload, ServerFrame};
use crate::shared::visibility::project;

/// Event published to every subscriber of a board
#[derive(Debug, Clone)]
pub enum BoardEvent {
    Message {
        board_code: String,
        comment: Arc<AuthoredComment>,
    },
    Activity {
        board_code: String,
        comment: Arc<AuthoredComment>,
    },
}

/// Who is on the receiving end of a board subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscriber {
    pub user_id: Uuid,
    /// Current admin flag; updated in place on role changes
    pub is_admin: bool,
}

impl BoardEvent {
    pub fn message(board_code: impl Into<String>, comment: Arc<AuthoredComment>) -> Self {
        BoardEvent::Message {
            board_code: board_code.into(),
            comment,
        }
    }

    pub fn activity(board_code: impl Into<String>, comment: Arc<AuthoredComment>) -> Self {
        BoardEvent::Activity {
            board_code: board_code.into(),
            comment,
        }
    }

    /// Render the frame this subscriber should receive, if any
    pub fn render_for(&self, subscriber: &Subscriber) -> Option<ServerFrame> {
        match self {
            BoardEvent::Message { board_code, comment } => {
                let view = project(comment, subscriber.user_id, subscriber.is_admin)?;
                Some(ServerFrame::ReceiveMessage(MessagePayload {
                    board_code: board_code.clone(),
                    comment: view,
                }))
            }
            BoardEvent::Activity { board_code, comment } => {
                let view = project(comment, subscriber.user_id, subscriber.is_admin)?;
                Some(ServerFrame::BoardActivity(ActivityPayload {
                    board_code: board_code.clone(),
                    board_id: comment.comment.board_id,
                    last_activity: comment.comment.created_at,
                    last_comment_preview: comment.comment.preview(),
                    last_comment_visibility: comment.comment.visibility,
                    last_comment_anonymous: comment.comment.anonymous,
                    last_sender: view.displayed_sender,
                }))
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BoardEvent::Message { .. } => "message",
            BoardEvent::Activity { .. } => "activity",
        }
    }
}

/// Broadcast an event to all subscribers of a board channel
///
/// # Returns
///
/// Number of receivers the event was queued for (0 if there are none)
pub fn broadcast_event(broadcast_tx: &broadcast::Sender<BoardEvent>, event: BoardEvent) -> usize {
    let kind = event.kind();
    match broadcast_tx.send(event) {
        Ok(subscriber_count) => {
            tracing::debug!("[Realtime] {} event queued for {} subscribers", kind, subscriber_count);
            subscriber_count
        }
        Err(_) => {
            tracing::debug!("[Realtime] No subscribers to receive {} event", kind);
            0
        }
    }
}
