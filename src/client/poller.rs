//! # Liveness Poller
//!
//! Falls back to pulling when push has gone quiet. A poll is due when no
//! push has arrived for `silence_threshold`, and two polls are never closer
//! than `min_poll_interval`. [`PollTask`] runs the loop in the background
//! and is aborted when dropped.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::client::config::Config;

#[derive(Debug)]
pub struct LivenessPoller {
    last_push: RwLock<Option<Instant>>,
    last_poll: RwLock<Option<Instant>>,
    silence_threshold: Duration,
    min_poll_interval: Duration,
    is_active: RwLock<bool>,
}

impl LivenessPoller {
    pub fn new(silence_threshold: Duration, min_poll_interval: Duration) -> Self {
        Self {
            last_push: RwLock::new(None),
            last_poll: RwLock::new(None),
            silence_threshold,
            min_poll_interval,
            is_active: RwLock::new(false),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.silence_threshold, config.min_poll_interval)
    }

    pub async fn start(&self) {
        *self.is_active.write().await = true;
        // Silence is measured from start, not from the epoch
        self.last_push.write().await.get_or_insert_with(Instant::now);
    }

    pub async fn stop(&self) {
        *self.is_active.write().await = false;
    }

    pub async fn is_active(&self) -> bool {
        *self.is_active.read().await
    }

    /// Any trusted push counts as a sign of life.
    pub async fn record_push(&self) {
        *self.last_push.write().await = Some(Instant::now());
    }

    pub async fn record_poll(&self) {
        *self.last_poll.write().await = Some(Instant::now());
    }

    /// Whether a liveness poll should run now.
    pub async fn should_poll(&self) -> bool {
        self.should_poll_at(Instant::now()).await
    }

    pub async fn should_poll_at(&self, now: Instant) -> bool {
        if !*self.is_active.read().await {
            return false;
        }

        let silent = match *self.last_push.read().await {
            Some(at) => now.saturating_duration_since(at) >= self.silence_threshold,
            None => true,
        };
        silent && self.debounce_elapsed(now).await
    }

    /// Catch-up after a reconnect ignores the silence threshold but still
    /// respects the minimum interval.
    pub async fn should_catch_up_at(&self, now: Instant) -> bool {
        *self.is_active.read().await && self.debounce_elapsed(now).await
    }

    async fn debounce_elapsed(&self, now: Instant) -> bool {
        match *self.last_poll.read().await {
            Some(at) => now.saturating_duration_since(at) >= self.min_poll_interval,
            None => true,
        }
    }
}

/// Background poll loop, aborted on drop.
#[derive(Debug)]
pub struct PollTask {
    handle: JoinHandle<()>,
}

impl PollTask {
    /// Run `poll` whenever the poller says a poll is due, checking every `tick`.
    pub fn spawn<F, Fut>(poller: std::sync::Arc<LivenessPoller>, tick: Duration, mut poll: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if !poller.is_active().await {
                    break;
                }
                if poller.should_poll().await {
                    poller.record_poll().await;
                    tracing::debug!("[Sync] Push silent, running liveness poll");
                    poll().await;
                }
            }
        });
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PollTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
