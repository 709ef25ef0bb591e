//! # Client Session
//!
//! Owns everything one signed-in client knows about its boards: channel
//! state, one timeline per followed board, unread counters, the send queue
//! and the liveness poller. Channel frames, send results and pulls all end
//! up as [`SyncEvent`]s applied to the right timeline.
//!
//! The session does no I/O of its own except through [`BoardApi`]; the
//! socket is driven by the caller, which feeds inbound frames to
//! [`ClientSession::handle_frame`] and writes the frames the session returns.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::client::activity::UnreadCounters;
use crate::client::api::{BoardApi, PostedComment};
use crate::client::channel::ChannelTracker;
use crate::client::config::Config;
use crate::client::error::ClientError;
use crate::client::outbox::{BackoffPolicy, FailureAction, Outbox};
use crate::client::poller::LivenessPoller;
use crate::client::timeline::{BoardTimeline, LocalComment, SyncEvent};
use crate::shared::clock;
use crate::shared::comment::NewComment;
use crate::shared::cursor::{Cursor, ListCommentsQuery, MAX_PAGE_SIZE};
use crate::shared::event::{AckPayload, ClientFrame, ServerFrame};

/// What the caller should do after a frame was handled
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameEffect {
    /// Board whose timeline changed and should be redrawn
    pub changed: Option<Uuid>,
    /// Board that needs a catch-up pull
    pub catch_up: Option<Uuid>,
    /// Error to show the user
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct ClientSession {
    viewer_id: Uuid,
    display_name: String,
    channels: ChannelTracker,
    timelines: HashMap<Uuid, BoardTimeline>,
    board_ids: HashMap<String, Uuid>,
    counters: UnreadCounters,
    outbox: Outbox,
    poller: Arc<LivenessPoller>,
}

impl ClientSession {
    pub fn new(viewer_id: Uuid, display_name: impl Into<String>, config: &Config) -> Self {
        let display_name = display_name.into();
        Self {
            viewer_id,
            channels: ChannelTracker::new(display_name.clone()),
            display_name,
            timelines: HashMap::new(),
            board_ids: HashMap::new(),
            counters: UnreadCounters::new(viewer_id),
            outbox: Outbox::new(BackoffPolicy::default()),
            poller: Arc::new(LivenessPoller::from_config(config)),
        }
    }

    pub fn viewer_id(&self) -> Uuid {
        self.viewer_id
    }

    pub fn poller(&self) -> Arc<LivenessPoller> {
        self.poller.clone()
    }

    pub fn counters(&self) -> &UnreadCounters {
        &self.counters
    }

    pub fn channels(&self) -> &ChannelTracker {
        &self.channels
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn timeline(&self, board_id: Uuid) -> Option<&BoardTimeline> {
        self.timelines.get(&board_id)
    }

    pub fn board_id(&self, board_code: &str) -> Option<Uuid> {
        self.board_ids.get(board_code).copied()
    }

    /// Start following a board. Returns the join frame to send.
    pub fn follow_board(&mut self, board_id: Uuid, board_code: &str, is_admin: bool) -> Option<ClientFrame> {
        self.board_ids.insert(board_code.to_string(), board_id);
        self.timelines
            .entry(board_id)
            .or_insert_with(|| BoardTimeline::new(board_id, self.viewer_id, is_admin))
            .set_admin(is_admin);
        self.counters.set_admin(board_id, is_admin);
        self.channels.request_join(board_code)
    }

    pub fn unfollow_board(&mut self, board_code: &str) -> Option<ClientFrame> {
        if let Some(board_id) = self.board_ids.remove(board_code) {
            self.timelines.remove(&board_id);
            self.counters.set_admin(board_id, false);
        }
        self.channels.leave(board_code)
    }

    /// Make a board the open one; its unread counter resets.
    pub fn open_board(&mut self, board_id: Option<Uuid>) {
        self.counters.open(board_id);
    }

    /// Apply one inbound channel frame.
    pub async fn handle_frame(&mut self, frame: ServerFrame) -> FrameEffect {
        let mut effect = FrameEffect::default();
        match frame {
            ServerFrame::JoinedRoom(room) => {
                if self.channels.on_joined(&room.board_code) {
                    effect.catch_up = self.board_id(&room.board_code);
                }
            }
            ServerFrame::ReceiveMessage(payload) => {
                if !self.channels.is_trusted(&payload.board_code) {
                    tracing::debug!(
                        "[Sync] Dropping push for {} before rejoin completed",
                        payload.board_code
                    );
                    return effect;
                }
                self.poller.record_push().await;
                self.counters.record_message(&payload.comment);
                let board_id = payload.comment.board_id;
                if let Some(timeline) = self.timelines.get_mut(&board_id) {
                    if timeline.apply(SyncEvent::Pushed(payload.comment)).changed() {
                        effect.changed = Some(board_id);
                    }
                }
            }
            ServerFrame::MessageAck(ack) => {
                self.outbox.mark_sent(&ack.client_id);
                effect.changed = self.apply_ack(ack);
            }
            ServerFrame::BoardActivity(activity) => {
                self.poller.record_push().await;
                self.counters.record_activity(&activity);
            }
            ServerFrame::Error(error) => {
                if let Some(code) = error.board_code.as_deref() {
                    self.channels.on_join_rejected(code);
                }
                effect.error = Some(error.message);
            }
        }
        effect
    }

    fn apply_ack(&mut self, ack: AckPayload) -> Option<Uuid> {
        let board_id = self.board_id(&ack.board_code)?;
        let timeline = self.timelines.get_mut(&board_id)?;
        timeline.apply(SyncEvent::Acked(ack)).changed().then_some(board_id)
    }

    /// Queue a comment and show it optimistically. Returns its token.
    pub fn compose(&mut self, request: NewComment, now: Instant) -> Result<String, ClientError> {
        let (content, _) = request.normalized().map_err(|e| ClientError::Rejected {
            status: 400,
            message: e.to_string(),
        })?;
        let timeline = self
            .timelines
            .get_mut(&request.board_id)
            .ok_or(ClientError::NotFound)?;

        let local = LocalComment {
            client_id: String::new(),
            text: content,
            visibility: request.visibility,
            anonymous: request.anonymous,
            author_name: self.display_name.clone(),
            at: clock::now(),
        };
        let client_id = self.outbox.enqueue(request, now);
        timeline.apply(SyncEvent::LocalSend(LocalComment {
            client_id: client_id.clone(),
            ..local
        }));
        Ok(client_id)
    }

    /// Feed back the result of a create call.
    pub fn send_result(
        &mut self,
        board_id: Uuid,
        client_id: &str,
        result: Result<PostedComment, ClientError>,
        now: Instant,
    ) -> Option<FailureAction> {
        match result {
            Ok(posted) => {
                self.outbox.mark_sent(client_id);
                if let Some(timeline) = self.timelines.get_mut(&board_id) {
                    timeline.apply(SyncEvent::Sent(posted.comment));
                }
                None
            }
            Err(error) => {
                let action = self.outbox.mark_failed(client_id, error, now)?;
                if let FailureAction::GiveUp { .. } = action {
                    if let Some(timeline) = self.timelines.get_mut(&board_id) {
                        timeline.apply(SyncEvent::SendFailed {
                            client_id: client_id.to_string(),
                        });
                    }
                }
                Some(action)
            }
        }
    }

    /// Send every queued comment that is due. Returns how many were accepted.
    pub async fn flush_outbox(&mut self, api: &BoardApi) -> usize {
        let mut accepted = 0;
        for request in self.outbox.ready(Instant::now()) {
            let client_id = request.client_message_id.clone().unwrap_or_default();
            let result = api.post_comment(&request).await;
            if result.is_ok() {
                accepted += 1;
            }
            self.send_result(request.board_id, &client_id, result, Instant::now());
        }
        accepted
    }

    /// Query for the first catch-up page of a board.
    ///
    /// Resumes after the last pulled position, so rows sharing its
    /// timestamp are still fetched. Before the first pull this is the
    /// initial load.
    pub fn catch_up_query(&self, board_id: Uuid) -> ListCommentsQuery {
        match self.timelines.get(&board_id).and_then(BoardTimeline::synced_through) {
            Some(cursor) => ListCommentsQuery::after(cursor, Some(MAX_PAGE_SIZE)),
            None => ListCommentsQuery::default(),
        }
    }

    /// Pull whatever the channel may have missed and merge it.
    ///
    /// Forward pages are followed until one comes back short, so nothing
    /// between pages is skipped. Returns the number of new entries.
    pub async fn catch_up(&mut self, api: &BoardApi, board_id: Uuid) -> Result<usize, ClientError> {
        self.poller.record_poll().await;
        let mut query = self.catch_up_query(board_id);
        let mut inserted = 0;

        loop {
            let page = api.list_comments(board_id, &query).await?;
            let full = page.comments.len() == MAX_PAGE_SIZE as usize;
            let last = page.comments.last().map(|c| Cursor::new(c.created_at, c.id));
            let forward = query.cursor.is_some();

            let Some(timeline) = self.timelines.get_mut(&board_id) else {
                return Ok(inserted);
            };
            inserted += timeline.apply(SyncEvent::Pulled(page.comments)).inserted;

            let more = forward && page.has_more.unwrap_or(full);
            match last {
                Some(cursor) if more => query = ListCommentsQuery::after(cursor, Some(MAX_PAGE_SIZE)),
                _ => break,
            }
        }

        tracing::debug!("[Sync] Catch-up for {} merged {} new comment(s)", board_id, inserted);
        Ok(inserted)
    }

    /// Transport dropped.
    pub fn on_disconnect(&mut self) {
        self.channels.on_disconnect();
    }

    /// Transport is back: rejoin frames to send, and queued sends become due.
    pub fn on_reconnect(&mut self, now: Instant) -> Vec<ClientFrame> {
        self.outbox.on_reconnect(now);
        self.channels.rejoin_frames()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::comment::{CommentView, Visibility};
    use crate::client::timeline::EntryStatus;
    use crate::shared::event::{ErrorPayload, MessagePayload};
    use assert_matches::assert_matches;

    fn session() -> (ClientSession, Uuid) {
        let me = Uuid::new_v4();
        (ClientSession::new(me, "alice", &Config::default()), me)
    }

    fn pushed(board_id: Uuid, sender: Uuid, client_id: Option<&str>) -> CommentView {
        CommentView {
            id: Uuid::now_v7(),
            board_id,
            text: "hello".into(),
            visibility: Visibility::Everyone,
            displayed_sender: "alice".into(),
            actual_sender: None,
            sender_id: Some(sender),
            anonymous: false,
            created_at: clock::now(),
            client_message_id: client_id.map(str::to_string),
        }
    }

    fn receive(code: &str, comment: CommentView) -> ServerFrame {
        ServerFrame::ReceiveMessage(MessagePayload {
            board_code: code.into(),
            comment,
        })
    }

    #[tokio::test]
    async fn test_first_join_requests_initial_load() {
        let (mut session, _) = session();
        let board = Uuid::new_v4();
        assert!(session.follow_board(board, "ABC", false).is_some());

        let effect = session.handle_frame(ServerFrame::joined("ABC")).await;
        assert_eq!(effect.catch_up, Some(board));
        assert_eq!(session.catch_up_query(board), ListCommentsQuery::default());
    }

    #[tokio::test]
    async fn test_pushes_ignored_until_rejoined() {
        let (mut session, me) = session();
        let board = Uuid::new_v4();
        session.follow_board(board, "ABC", false);
        session.handle_frame(ServerFrame::joined("ABC")).await;

        session.on_disconnect();
        let effect = session.handle_frame(receive("ABC", pushed(board, me, None))).await;
        assert_eq!(effect.changed, None);
        assert!(session.timeline(board).unwrap().is_empty());

        let frames = session.on_reconnect(Instant::now());
        assert_eq!(frames.len(), 1);
        let effect = session.handle_frame(ServerFrame::joined("ABC")).await;
        assert_eq!(effect.catch_up, Some(board));

        let effect = session.handle_frame(receive("ABC", pushed(board, me, None))).await;
        assert_eq!(effect.changed, Some(board));
    }

    #[tokio::test]
    async fn test_own_confirmations_do_not_skip_missed_window() {
        let (mut session, me) = session();
        let board = Uuid::new_v4();
        session.follow_board(board, "ABC", false);
        session.handle_frame(ServerFrame::joined("ABC")).await;
        session.handle_frame(receive("ABC", pushed(board, Uuid::new_v4(), None))).await;

        session.on_disconnect();
        let token = session
            .compose(NewComment::new(board, "hi").with_client_id("c1"), Instant::now())
            .unwrap();
        session.on_reconnect(Instant::now());
        let mut mine = pushed(board, me, Some("c1"));
        mine.created_at = clock::now() + chrono::Duration::seconds(2);
        let posted = PostedComment { comment: mine, created_new: true };
        assert_eq!(session.send_result(board, &token, Ok(posted), Instant::now()), None);

        let effect = session.handle_frame(ServerFrame::joined("ABC")).await;
        assert_eq!(effect.catch_up, Some(board));
        // Nothing was pulled yet, so the whole recent window is loaded again
        assert_eq!(session.catch_up_query(board), ListCommentsQuery::default());
    }

    #[tokio::test]
    async fn test_compose_then_ack_confirms_and_clears_outbox() {
        let (mut session, _) = session();
        let board = Uuid::new_v4();
        session.follow_board(board, "ABC", false);
        session.handle_frame(ServerFrame::joined("ABC")).await;

        let token = session
            .compose(NewComment::new(board, "  hi  ").with_client_id("c1"), Instant::now())
            .unwrap();
        assert_eq!(token, "c1");
        let entry = session.timeline(board).unwrap().find_by_client_id("c1").unwrap();
        assert_eq!(entry.text, "hi");
        assert_eq!(entry.status, EntryStatus::Pending);
        assert_eq!(session.outbox().len(), 1);

        let ack = AckPayload {
            board_code: "ABC".into(),
            client_id: "c1".into(),
            id: Uuid::now_v7(),
            created_at: clock::now(),
        };
        let effect = session.handle_frame(ServerFrame::MessageAck(ack)).await;
        assert_eq!(effect.changed, Some(board));
        assert!(session.outbox().is_empty());
        let entry = session.timeline(board).unwrap().find_by_client_id("c1").unwrap();
        assert_eq!(entry.status, EntryStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_compose_rejects_blank_and_unknown_board() {
        let (mut session, _) = session();
        let board = Uuid::new_v4();
        assert_matches!(
            session.compose(NewComment::new(board, "hi"), Instant::now()),
            Err(ClientError::NotFound)
        );
        session.follow_board(board, "ABC", false);
        assert_matches!(
            session.compose(NewComment::new(board, "   "), Instant::now()),
            Err(ClientError::Rejected { status: 400, .. })
        );
        assert!(session.outbox().is_empty());
    }

    #[tokio::test]
    async fn test_terminal_send_failure_marks_entry_failed() {
        let (mut session, _) = session();
        let board = Uuid::new_v4();
        session.follow_board(board, "ABC", false);
        let token = session
            .compose(NewComment::new(board, "hi"), Instant::now())
            .unwrap();

        let action = session.send_result(
            board,
            &token,
            Err(ClientError::Rejected { status: 403, message: "Forbidden".into() }),
            Instant::now(),
        );
        assert_matches!(action, Some(FailureAction::GiveUp { .. }));
        let entry = session.timeline(board).unwrap().find_by_client_id(&token).unwrap();
        assert_eq!(entry.status, EntryStatus::Failed);
    }

    #[tokio::test]
    async fn test_rejected_join_surfaces_error() {
        let (mut session, _) = session();
        session.follow_board(Uuid::new_v4(), "ABC", false);
        let effect = session
            .handle_frame(ServerFrame::Error(ErrorPayload {
                board_code: Some("ABC".into()),
                message: "Not a member of this board".into(),
            }))
            .await;
        assert_eq!(effect.error.as_deref(), Some("Not a member of this board"));
        // Rejected boards can be joined again
        let board = session.board_id("ABC").unwrap();
        assert!(session.follow_board(board, "ABC", false).is_some());
    }

    #[tokio::test]
    async fn test_unread_counts_for_closed_boards_only() {
        let (mut session, _) = session();
        let (open, closed) = (Uuid::new_v4(), Uuid::new_v4());
        session.follow_board(open, "OPEN", false);
        session.follow_board(closed, "CLOSED", false);
        session.handle_frame(ServerFrame::joined("OPEN")).await;
        session.handle_frame(ServerFrame::joined("CLOSED")).await;
        session.open_board(Some(open));

        let bob = Uuid::new_v4();
        session.handle_frame(receive("OPEN", pushed(open, bob, None))).await;
        session.handle_frame(receive("CLOSED", pushed(closed, bob, None))).await;

        assert_eq!(session.counters().unread(open), 0);
        assert_eq!(session.counters().unread(closed), 1);
    }
}
