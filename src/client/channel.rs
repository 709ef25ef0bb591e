//! # Channel Subscription Tracking
//!
//! Per-board state of the realtime channel as seen from one client:
//! `Unsubscribed -> Joining -> Subscribed`. A transport drop sends every
//! board back to `Unsubscribed`; pushes are only trusted again after the
//! server has answered the rejoin, and the gap in between must be covered
//! by a catch-up pull.

use std::collections::HashMap;

use crate::shared::event::ClientFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Unsubscribed,
    Joining,
    Subscribed,
}

#[derive(Debug, Clone)]
struct BoardChannel {
    state: ChannelState,
    /// Set when a disconnect opened a window of possibly missed pushes
    missed_window: bool,
    /// Set once the board has been subscribed at least once
    ever_subscribed: bool,
}

/// Tracks the channel state of every board this client wants to follow.
#[derive(Debug, Clone)]
pub struct ChannelTracker {
    display_name: String,
    boards: HashMap<String, BoardChannel>,
}

impl ChannelTracker {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            boards: HashMap::new(),
        }
    }

    pub fn state(&self, board_code: &str) -> ChannelState {
        self.boards
            .get(board_code)
            .map(|b| b.state)
            .unwrap_or(ChannelState::Unsubscribed)
    }

    /// Pushes for this board may be applied to the timeline.
    pub fn is_trusted(&self, board_code: &str) -> bool {
        self.state(board_code) == ChannelState::Subscribed
    }

    pub fn boards(&self) -> impl Iterator<Item = &str> {
        self.boards.keys().map(String::as_str)
    }

    /// Start following a board. Returns the join frame to send, or `None`
    /// when a join is already in flight or done.
    pub fn request_join(&mut self, board_code: &str) -> Option<ClientFrame> {
        let channel = self
            .boards
            .entry(board_code.to_string())
            .or_insert(BoardChannel {
                state: ChannelState::Unsubscribed,
                missed_window: false,
                ever_subscribed: false,
            });

        match channel.state {
            ChannelState::Unsubscribed => {
                channel.state = ChannelState::Joining;
                tracing::debug!("[Sync] Joining board channel {}", board_code);
                Some(ClientFrame::join(board_code, self.display_name.clone()))
            }
            ChannelState::Joining | ChannelState::Subscribed => None,
        }
    }

    /// Handle `joined-room`. Returns `true` when a catch-up pull is needed
    /// to cover pushes that may have been missed before this join.
    pub fn on_joined(&mut self, board_code: &str) -> bool {
        let Some(channel) = self.boards.get_mut(board_code) else {
            tracing::debug!("[Sync] joined-room for untracked board {}", board_code);
            return false;
        };
        if channel.state == ChannelState::Subscribed {
            return false;
        }

        channel.state = ChannelState::Subscribed;
        let needs_catch_up = channel.missed_window || !channel.ever_subscribed;
        channel.missed_window = false;
        channel.ever_subscribed = true;
        needs_catch_up
    }

    /// A rejected join leaves the board unsubscribed.
    pub fn on_join_rejected(&mut self, board_code: &str) {
        if let Some(channel) = self.boards.get_mut(board_code) {
            if channel.state == ChannelState::Joining {
                channel.state = ChannelState::Unsubscribed;
            }
        }
    }

    /// Transport dropped: every board is unsubscribed and flagged for catch-up.
    pub fn on_disconnect(&mut self) {
        for channel in self.boards.values_mut() {
            if channel.state != ChannelState::Unsubscribed || channel.ever_subscribed {
                channel.missed_window = true;
            }
            channel.state = ChannelState::Unsubscribed;
        }
    }

    /// Join frames for every followed board, sent after a reconnect.
    pub fn rejoin_frames(&mut self) -> Vec<ClientFrame> {
        let codes: Vec<String> = self.boards.keys().cloned().collect();
        codes
            .iter()
            .filter_map(|code| self.request_join(code))
            .collect()
    }

    /// Stop following a board. Returns the leave frame when it was joined.
    pub fn leave(&mut self, board_code: &str) -> Option<ClientFrame> {
        let channel = self.boards.remove(board_code)?;
        match channel.state {
            ChannelState::Unsubscribed => None,
            ChannelState::Joining | ChannelState::Subscribed => Some(ClientFrame::leave(board_code)),
        }
    }
}
