//! Connection and board channel registry.
//!
//! Each board gets its own `broadcast` channel, created on first join and
//! dropped by the periodic cleanup once nobody listens. Each socket gets a
//! [`ConnectionId`] and an outbound queue; joining a board spawns a
//! forwarding task that renders board events for that connection's viewer
//! and pushes the resulting frames onto the queue.
//!
//! Closing a connection aborts all its forwarding tasks, which drops their
//! broadcast receivers. Nothing outlives the socket.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::backend::realtime::broadcast::{broadcast_event, BoardEvent, Subscriber};
use crate::shared::event::ServerFrame;

pub type ConnectionId = u64;

struct Subscription {
    task: JoinHandle<()>,
    /// Read by the forwarding task for every event
    is_admin: Arc<AtomicBool>,
}

impl Subscription {
    fn cancel(self) {
        self.task.abort();
    }
}

struct Connection {
    user_id: Uuid,
    outbound: mpsc::UnboundedSender<ServerFrame>,
    /// Forwarding task per joined board
    subscriptions: HashMap<Uuid, Subscription>,
}

/// Registry of open connections and per-board broadcast channels
#[derive(Clone)]
pub struct ConnectionManager {
    channels: Arc<DashMap<Uuid, broadcast::Sender<BoardEvent>>>,
    connections: Arc<DashMap<ConnectionId, Connection>>,
    next_id: Arc<AtomicU64>,
    capacity: usize,
}

impl ConnectionManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            connections: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
            capacity: capacity.max(1),
        }
    }

    /// Register a connection; frames for it arrive on the returned receiver
    pub fn connect(&self, user_id: Uuid) -> (ConnectionId, mpsc::UnboundedReceiver<ServerFrame>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (outbound, rx) = mpsc::unbounded_channel();
        self.connections.insert(
            id,
            Connection {
                user_id,
                outbound,
                subscriptions: HashMap::new(),
            },
        );
        tracing::debug!("[Socket] Connection {} opened for user {}", id, user_id);
        (id, rx)
    }

    /// Get or create a board's channel and attach a receiver to it.
    ///
    /// The receiver is created under the entry lock, so the cleanup sweep
    /// can never drop the channel between creation and subscription.
    fn receiver(&self, board_id: Uuid) -> broadcast::Receiver<BoardEvent> {
        self.channels
            .entry(board_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Subscribe a connection to a board's events
    ///
    /// Re-joining replaces the previous subscription, picking up the
    /// viewer's current admin flag. Returns `false` if the connection is gone.
    pub fn subscribe(&self, connection_id: ConnectionId, board_id: Uuid, is_admin: bool) -> bool {
        let Some(mut connection) = self.connections.get_mut(&connection_id) else {
            return false;
        };
        let rx = self.receiver(board_id);
        let flag = Arc::new(AtomicBool::new(is_admin));
        let task = tokio::spawn(forward_board_events(
            rx,
            connection.outbound.clone(),
            connection.user_id,
            flag.clone(),
            connection_id,
        ));

        let subscription = Subscription { task, is_admin: flag };
        if let Some(previous) = connection.subscriptions.insert(board_id, subscription) {
            previous.cancel();
        }
        tracing::info!(
            "[Realtime] Connection {} joined board {} (admin: {})",
            connection_id,
            board_id,
            is_admin
        );
        true
    }

    pub fn unsubscribe(&self, connection_id: ConnectionId, board_id: Uuid) {
        if let Some(mut connection) = self.connections.get_mut(&connection_id) {
            if let Some(subscription) = connection.subscriptions.remove(&board_id) {
                subscription.cancel();
                tracing::debug!("[Realtime] Connection {} left board {}", connection_id, board_id);
            }
        }
    }

    /// Drop every subscription a user holds on a board
    ///
    /// Called when the user leaves the board, so nothing created after the
    /// leave reaches their open sockets.
    pub fn revoke(&self, board_id: Uuid, user_id: Uuid) -> usize {
        let mut revoked = 0;
        for mut entry in self.connections.iter_mut() {
            if entry.user_id != user_id {
                continue;
            }
            if let Some(subscription) = entry.subscriptions.remove(&board_id) {
                subscription.cancel();
                revoked += 1;
            }
        }
        if revoked > 0 {
            tracing::info!(
                "[Realtime] Revoked {} subscriptions of user {} on board {}",
                revoked,
                user_id,
                board_id
            );
        }
        revoked
    }

    /// Apply a role change to a user's live subscriptions on a board
    ///
    /// Call after the role is stored; the next event each forwarding task
    /// renders uses the new flag. Returns how many subscriptions changed.
    pub fn update_role(&self, board_id: Uuid, user_id: Uuid, is_admin: bool) -> usize {
        let mut updated = 0;
        for entry in self.connections.iter() {
            if entry.user_id != user_id {
                continue;
            }
            if let Some(subscription) = entry.subscriptions.get(&board_id) {
                subscription.is_admin.store(is_admin, Ordering::Relaxed);
                updated += 1;
            }
        }
        if updated > 0 {
            tracing::info!(
                "[Realtime] Updated {} subscriptions of user {} on board {} (admin: {})",
                updated,
                user_id,
                board_id,
                is_admin
            );
        }
        updated
    }

    /// Tear down a connection and all its subscriptions
    pub fn disconnect(&self, connection_id: ConnectionId) {
        if let Some((_, connection)) = self.connections.remove(&connection_id) {
            for (_, subscription) in connection.subscriptions {
                subscription.cancel();
            }
            tracing::debug!("[Socket] Connection {} closed", connection_id);
        }
    }

    /// Publish an event to a board's subscribers
    pub fn publish(&self, board_id: Uuid, event: BoardEvent) -> usize {
        let sender = self.channels.get(&board_id).map(|s| s.clone());
        match sender {
            Some(sender) => broadcast_event(&sender, event),
            None => {
                tracing::debug!("[Realtime] No channel for board {}", board_id);
                0
            }
        }
    }

    /// Send a frame to one connection
    pub fn send_to(&self, connection_id: ConnectionId, frame: ServerFrame) -> bool {
        match self.connections.get(&connection_id) {
            Some(connection) => connection.outbound.send(frame).is_ok(),
            None => false,
        }
    }

    /// Send a frame to every open connection of a user
    pub fn send_to_user(&self, user_id: Uuid, frame: &ServerFrame) -> usize {
        let mut delivered = 0;
        for entry in self.connections.iter() {
            if entry.user_id == user_id && entry.outbound.send(frame.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Drop board channels that have no receivers left
    pub fn cleanup_inactive_channels(&self) -> usize {
        let before = self.channels.len();
        self.channels.retain(|_, sender| sender.receiver_count() > 0);
        before.saturating_sub(self.channels.len())
    }

    pub fn subscriber_count(&self, board_id: Uuid) -> usize {
        self.channels
            .get(&board_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

async fn forward_board_events(
    mut rx: broadcast::Receiver<BoardEvent>,
    outbound: mpsc::UnboundedSender<ServerFrame>,
    user_id: Uuid,
    is_admin: Arc<AtomicBool>,
    connection_id: ConnectionId,
) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                let subscriber = Subscriber {
                    user_id,
                    is_admin: is_admin.load(Ordering::Relaxed),
                };
                let Some(frame) = event.render_for(&subscriber) else {
                    continue;
                };
                if outbound.send(frame).is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                // The client's liveness poll recovers whatever was skipped.
                tracing::warn!(
                    "[Realtime] Connection {} lagged, skipped {} events",
                    connection_id,
                    skipped
                );
            }
            Err(RecvError::Closed) => break,
        }
    }
}
