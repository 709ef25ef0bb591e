//! # Board Timeline
//!
//! Client-side list of comments for one open board. Optimistic sends, pushed
//! messages, acks and pulled pages all go through [`BoardTimeline::apply`],
//! which merges by server id (falling back to the idempotency token) and
//! re-sorts by `(created_at, id)` afterwards.
//!
//! Only pulled pages move the sync position ([`BoardTimeline::synced_through`]).
//! Pushes, acks and create responses can confirm entries past a gap the
//! channel missed, so they never advance it.
//!
//! Applying the same event twice leaves the timeline unchanged, and the
//! order in which the confirmation paths arrive does not matter: every
//! message ends up as exactly one entry.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use boardsync::client::timeline::{BoardTimeline, SyncEvent};
//! # fn demo(board_id: uuid::Uuid, me: uuid::Uuid, view: boardsync::shared::CommentView) {
//! let mut timeline = BoardTimeline::new(board_id, me, false);
//! timeline.apply(SyncEvent::Pushed(view));
//! for entry in timeline.entries() {
//!     println!("{}: {}", entry.displayed_sender, entry.text);
//! }
//! # }
//! ```

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::shared::comment::{CommentView, Visibility};
use crate::shared::cursor::Cursor;
use crate::shared::event::AckPayload;
use crate::shared::visibility::view_visible_to;

/// Delivery state of a timeline entry.
///
/// Transitions only move forward: `Pending -> Confirmed` or
/// `Pending -> Failed`. A server copy of a failed entry still confirms it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Pending,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry {
    /// Set once the server has assigned an id (push, ack or pull)
    pub server_id: Option<Uuid>,
    /// Idempotency token, only known for comments sent from this device
    pub client_id: Option<String>,
    pub text: String,
    pub visibility: Visibility,
    pub displayed_sender: String,
    pub actual_sender: Option<String>,
    pub anonymous: bool,
    pub created_at: DateTime<Utc>,
    pub status: EntryStatus,
}

impl TimelineEntry {
    fn from_view(view: CommentView) -> Self {
        Self {
            server_id: Some(view.id),
            client_id: view.client_message_id,
            text: view.text,
            visibility: view.visibility,
            displayed_sender: view.displayed_sender,
            actual_sender: view.actual_sender,
            anonymous: view.anonymous,
            created_at: view.created_at,
            status: EntryStatus::Confirmed,
        }
    }

    /// Overwrite local fields with the server's copy.
    fn absorb_view(&mut self, view: CommentView) {
        self.server_id = Some(view.id);
        if view.client_message_id.is_some() {
            self.client_id = view.client_message_id;
        }
        self.text = view.text;
        self.visibility = view.visibility;
        self.displayed_sender = view.displayed_sender;
        self.actual_sender = view.actual_sender;
        self.anonymous = view.anonymous;
        self.created_at = view.created_at;
        self.status = EntryStatus::Confirmed;
    }

    /// Fold a duplicate of the same message into this entry.
    fn absorb_entry(&mut self, other: TimelineEntry) {
        if self.server_id.is_none() {
            self.server_id = other.server_id;
            self.created_at = other.created_at;
        }
        if self.client_id.is_none() {
            self.client_id = other.client_id;
        }
        if other.status == EntryStatus::Confirmed {
            self.status = EntryStatus::Confirmed;
        }
    }

    /// Sort key. Pending entries have no id yet and sort after every
    /// confirmed entry with the same timestamp.
    fn order_key(&self) -> (DateTime<Utc>, u128, Option<&str>) {
        let id = self.server_id.map(|id| id.as_u128()).unwrap_or(u128::MAX);
        (self.created_at, id, self.client_id.as_deref())
    }

    pub fn is_pending(&self) -> bool {
        self.status == EntryStatus::Pending
    }
}

/// A locally composed comment, shown before the server has seen it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalComment {
    pub client_id: String,
    pub text: String,
    pub visibility: Visibility,
    pub anonymous: bool,
    pub author_name: String,
    pub at: DateTime<Utc>,
}

/// Every source of change to the timeline.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Optimistic insert of a comment composed on this device
    LocalSend(LocalComment),
    /// `receive-message` frame
    Pushed(CommentView),
    /// `message:ack` frame
    Acked(AckPayload),
    /// Server copy returned by the create call
    Sent(CommentView),
    /// Rows fetched by a catch-up or history pull
    Pulled(Vec<CommentView>),
    /// Send retries exhausted or rejected
    SendFailed { client_id: String },
}

/// What an [`BoardTimeline::apply`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub ignored: usize,
}

impl ApplyOutcome {
    pub fn changed(&self) -> bool {
        self.inserted > 0 || self.updated > 0
    }
}

#[derive(Debug, Clone)]
pub struct BoardTimeline {
    board_id: Uuid,
    viewer_id: Uuid,
    is_admin: bool,
    entries: Vec<TimelineEntry>,
    synced_through: Option<Cursor>,
}

impl BoardTimeline {
    pub fn new(board_id: Uuid, viewer_id: Uuid, is_admin: bool) -> Self {
        Self {
            board_id,
            viewer_id,
            is_admin,
            entries: Vec::new(),
            synced_through: None,
        }
    }

    pub fn board_id(&self) -> Uuid {
        self.board_id
    }

    pub fn set_admin(&mut self, is_admin: bool) {
        self.is_admin = is_admin;
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find_by_client_id(&self, client_id: &str) -> Option<&TimelineEntry> {
        self.entries
            .iter()
            .find(|e| e.client_id.as_deref() == Some(client_id))
    }

    pub fn find_by_server_id(&self, id: Uuid) -> Option<&TimelineEntry> {
        self.entries.iter().find(|e| e.server_id == Some(id))
    }

    pub fn pending(&self) -> impl Iterator<Item = &TimelineEntry> {
        self.entries.iter().filter(|e| e.is_pending())
    }

    /// Newest position covered by a pull; catch-up resumes strictly after it.
    pub fn synced_through(&self) -> Option<Cursor> {
        self.synced_through
    }

    /// Oldest confirmed position, used as `before` when loading history.
    pub fn oldest_confirmed(&self) -> Option<(DateTime<Utc>, Uuid)> {
        self.entries
            .iter()
            .filter_map(|e| e.server_id.map(|id| (e.created_at, id)))
            .min()
    }

    /// Merge one event into the timeline.
    pub fn apply(&mut self, event: SyncEvent) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();
        match event {
            SyncEvent::LocalSend(local) => self.apply_local(local, &mut outcome),
            SyncEvent::Pushed(view) | SyncEvent::Sent(view) => self.apply_view(view, &mut outcome),
            SyncEvent::Pulled(views) => {
                for view in views {
                    if view.board_id == self.board_id {
                        let position = Cursor::new(view.created_at, view.id);
                        self.synced_through = self.synced_through.max(Some(position));
                    }
                    self.apply_view(view, &mut outcome);
                }
            }
            SyncEvent::Acked(ack) => self.apply_ack(ack, &mut outcome),
            SyncEvent::SendFailed { client_id } => {
                match self.position_by_client_id(&client_id) {
                    Some(idx) if self.entries[idx].is_pending() => {
                        self.entries[idx].status = EntryStatus::Failed;
                        outcome.updated += 1;
                    }
                    _ => outcome.ignored += 1,
                }
            }
        }

        if outcome.changed() {
            self.entries.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        }
        outcome
    }

    fn apply_local(&mut self, local: LocalComment, outcome: &mut ApplyOutcome) {
        match self.position_by_client_id(&local.client_id) {
            // Resend of a failed comment
            Some(idx) if self.entries[idx].status == EntryStatus::Failed => {
                self.entries[idx].status = EntryStatus::Pending;
                outcome.updated += 1;
            }
            Some(_) => outcome.ignored += 1,
            None => {
                self.entries.push(TimelineEntry {
                    server_id: None,
                    client_id: Some(local.client_id),
                    text: local.text,
                    visibility: local.visibility,
                    displayed_sender: local.author_name,
                    actual_sender: None,
                    anonymous: local.anonymous,
                    created_at: local.at,
                    status: EntryStatus::Pending,
                });
                outcome.inserted += 1;
            }
        }
    }

    fn apply_view(&mut self, view: CommentView, outcome: &mut ApplyOutcome) {
        if view.board_id != self.board_id || !view_visible_to(&view, self.viewer_id, self.is_admin) {
            outcome.ignored += 1;
            return;
        }

        let client_id = view.client_message_id.clone();
        match self.collapse_matches(Some(view.id), client_id.as_deref()) {
            Some(idx) => {
                if self.entries[idx].status == EntryStatus::Confirmed && self.same_as(idx, &view) {
                    outcome.ignored += 1;
                } else {
                    self.entries[idx].absorb_view(view);
                    outcome.updated += 1;
                }
            }
            None => {
                self.entries.push(TimelineEntry::from_view(view));
                outcome.inserted += 1;
            }
        }
    }

    fn apply_ack(&mut self, ack: AckPayload, outcome: &mut ApplyOutcome) {
        let Some(idx) = self.collapse_matches(Some(ack.id), Some(&ack.client_id)) else {
            // Not ours or already gone; a pull will bring the row if it is visible.
            outcome.ignored += 1;
            return;
        };

        let entry = &mut self.entries[idx];
        if entry.status == EntryStatus::Confirmed
            && entry.server_id == Some(ack.id)
            && entry.created_at == ack.created_at
        {
            outcome.ignored += 1;
            return;
        }
        entry.server_id = Some(ack.id);
        entry.created_at = ack.created_at;
        entry.status = EntryStatus::Confirmed;
        outcome.updated += 1;
    }

    fn same_as(&self, idx: usize, view: &CommentView) -> bool {
        let entry = &self.entries[idx];
        entry.server_id == Some(view.id)
            && entry.created_at == view.created_at
            && entry.text == view.text
            && entry.displayed_sender == view.displayed_sender
            && entry.actual_sender == view.actual_sender
            && (view.client_message_id.is_none() || entry.client_id == view.client_message_id)
    }

    fn position_by_client_id(&self, client_id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.client_id.as_deref() == Some(client_id))
    }

    /// Find every entry matching either key and fold them into the first.
    /// Returns the index of the surviving entry.
    fn collapse_matches(&mut self, server_id: Option<Uuid>, client_id: Option<&str>) -> Option<usize> {
        let matches: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                (server_id.is_some() && e.server_id == server_id)
                    || (client_id.is_some() && e.client_id.as_deref() == client_id)
            })
            .map(|(idx, _)| idx)
            .collect();

        let (&keep, rest) = matches.split_first()?;
        for &idx in rest.iter().rev() {
            let dup = self.entries.remove(idx);
            self.entries[keep].absorb_entry(dup);
        }
        Some(keep)
    }
}
