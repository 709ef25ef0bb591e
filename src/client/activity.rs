//! Unread counters and sidebar summaries for boards that are not open.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::shared::comment::{CommentView, Visibility};
use crate::shared::event::ActivityPayload;
use crate::shared::visibility::view_visible_to;

/// Sidebar line for a board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSummary {
    pub last_activity: DateTime<Utc>,
    pub preview: String,
    pub visibility: Visibility,
    pub anonymous: bool,
    pub sender: String,
}

#[derive(Debug, Clone)]
pub struct UnreadCounters {
    viewer_id: Uuid,
    open_board: Option<Uuid>,
    admin_of: HashSet<Uuid>,
    unread: HashMap<Uuid, HashSet<Uuid>>,
    summaries: HashMap<Uuid, BoardSummary>,
}

impl UnreadCounters {
    pub fn new(viewer_id: Uuid) -> Self {
        Self {
            viewer_id,
            open_board: None,
            admin_of: HashSet::new(),
            unread: HashMap::new(),
            summaries: HashMap::new(),
        }
    }

    pub fn set_admin(&mut self, board_id: Uuid, is_admin: bool) {
        if is_admin {
            self.admin_of.insert(board_id);
        } else {
            self.admin_of.remove(&board_id);
        }
    }

    /// Switch the open board; its counter is cleared.
    pub fn open(&mut self, board_id: Option<Uuid>) {
        self.open_board = board_id;
        if let Some(board_id) = board_id {
            self.unread.remove(&board_id);
        }
    }

    pub fn open_board(&self) -> Option<Uuid> {
        self.open_board
    }

    /// Count a pushed message. Returns `true` if a counter moved.
    pub fn record_message(&mut self, view: &CommentView) -> bool {
        if Some(view.board_id) == self.open_board || view.sender_id == Some(self.viewer_id) {
            return false;
        }
        let is_admin = self.admin_of.contains(&view.board_id);
        if !view_visible_to(view, self.viewer_id, is_admin) {
            return false;
        }
        self.unread.entry(view.board_id).or_default().insert(view.id)
    }

    /// Refresh the sidebar summary. Older payloads never overwrite newer ones.
    ///
    /// The server only sends admin-only summaries to admins and the author,
    /// so no visibility check is repeated here.
    pub fn record_activity(&mut self, activity: &ActivityPayload) -> bool {
        if let Some(current) = self.summaries.get(&activity.board_id) {
            if current.last_activity > activity.last_activity {
                return false;
            }
        }
        self.summaries.insert(
            activity.board_id,
            BoardSummary {
                last_activity: activity.last_activity,
                preview: activity.last_comment_preview.clone(),
                visibility: activity.last_comment_visibility,
                anonymous: activity.last_comment_anonymous,
                sender: activity.last_sender.clone(),
            },
        );
        true
    }

    pub fn unread(&self, board_id: Uuid) -> usize {
        self.unread.get(&board_id).map(HashSet::len).unwrap_or(0)
    }

    pub fn total_unread(&self) -> usize {
        self.unread.values().map(HashSet::len).sum()
    }

    pub fn summary(&self, board_id: Uuid) -> Option<&BoardSummary> {
        self.summaries.get(&board_id)
    }
}
