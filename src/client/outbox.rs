//! # Send Queue
//!
//! Outgoing comments wait here until the server has accepted them. Each
//! entry keeps its idempotency token across retries, so a retry that races
//! an earlier success is absorbed by the server as a replay.
//!
//! Transient failures are retried with exponential backoff plus jitter.
//! Terminal failures and exhausted retries are handed back to the caller
//! to surface in the timeline.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rand::Rng;
use uuid::Uuid;

use crate::client::error::ClientError;
use crate::shared::comment::NewComment;

/// Exponential backoff configuration
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
    pub max_attempts: u32,
    /// Fraction of the delay added at random (0.0 to 1.0)
    pub jitter: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max: Duration::from_secs(60),
            max_attempts: 5,
            jitter: 0.1,
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (1-based), before jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base.saturating_mul(factor).min(self.max)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let delay = self.base_delay(attempt);
        if self.jitter <= 0.0 {
            return delay;
        }
        let extra = rand::thread_rng().gen_range(0.0..=self.jitter);
        delay + delay.mul_f64(extra)
    }
}

#[derive(Debug, Clone)]
pub struct OutboxEntry {
    pub request: NewComment,
    pub attempts: u32,
    pub next_attempt_at: Instant,
    pub last_error: Option<String>,
    in_flight: bool,
}

impl OutboxEntry {
    pub fn client_id(&self) -> &str {
        self.request.client_message_id.as_deref().unwrap_or_default()
    }
}

/// What to do after a failed send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureAction {
    Retry { at: Instant },
    GiveUp { error: ClientError },
}

#[derive(Debug, Default)]
pub struct Outbox {
    entries: VecDeque<OutboxEntry>,
    policy: BackoffPolicy,
}

impl Outbox {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            entries: VecDeque::new(),
            policy,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, client_id: &str) -> bool {
        self.entries.iter().any(|e| e.client_id() == client_id)
    }

    /// Queue a comment for sending. A token is assigned if the request has
    /// none; the (possibly new) token is returned.
    pub fn enqueue(&mut self, mut request: NewComment, now: Instant) -> String {
        let client_id = match request.client_message_id.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => token.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        request.client_message_id = Some(client_id.clone());

        if self.contains(&client_id) {
            return client_id;
        }
        self.entries.push_back(OutboxEntry {
            request,
            attempts: 0,
            next_attempt_at: now,
            last_error: None,
            in_flight: false,
        });
        client_id
    }

    /// Requests due at `now`, in queue order. They are marked in flight
    /// until [`mark_sent`](Self::mark_sent) or [`mark_failed`](Self::mark_failed).
    pub fn ready(&mut self, now: Instant) -> Vec<NewComment> {
        self.entries
            .iter_mut()
            .filter(|e| !e.in_flight && e.next_attempt_at <= now)
            .map(|e| {
                e.in_flight = true;
                e.request.clone()
            })
            .collect()
    }

    pub fn mark_sent(&mut self, client_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.client_id() != client_id);
        before != self.entries.len()
    }

    /// Record a failed attempt. Returns `None` for unknown tokens.
    pub fn mark_failed(&mut self, client_id: &str, error: ClientError, now: Instant) -> Option<FailureAction> {
        let idx = self.entries.iter().position(|e| e.client_id() == client_id)?;
        let entry = &mut self.entries[idx];
        entry.in_flight = false;
        entry.attempts += 1;
        entry.last_error = Some(error.to_string());

        if error.is_terminal() || entry.attempts >= self.policy.max_attempts {
            tracing::warn!(
                "[Sync] Giving up on comment {} after {} attempt(s): {}",
                client_id,
                entry.attempts,
                error
            );
            self.entries.remove(idx);
            return Some(FailureAction::GiveUp { error });
        }

        let at = now + self.policy.delay(entry.attempts);
        entry.next_attempt_at = at;
        tracing::debug!("[Sync] Retrying comment {} (attempt {})", client_id, entry.attempts + 1);
        Some(FailureAction::Retry { at })
    }

    /// Channel came back: everything waiting is due immediately.
    pub fn on_reconnect(&mut self, now: Instant) {
        for entry in self.entries.iter_mut().filter(|e| !e.in_flight) {
            entry.next_attempt_at = now;
        }
    }

    /// Time until the next entry becomes due.
    pub fn next_due(&self, now: Instant) -> Option<Duration> {
        self.entries
            .iter()
            .filter(|e| !e.in_flight)
            .map(|e| e.next_attempt_at.saturating_duration_since(now))
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn policy() -> BackoffPolicy {
        BackoffPolicy {
            jitter: 0.0,
            ..BackoffPolicy::default()
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = policy();
        assert_eq!(policy.delay(1), Duration::from_secs(1));
        assert_eq!(policy.delay(2), Duration::from_secs(2));
        assert_eq!(policy.delay(4), Duration::from_secs(8));
        assert_eq!(policy.delay(20), Duration::from_secs(60));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let policy = BackoffPolicy::default();
        for attempt in 1..6 {
            let base = policy.base_delay(attempt);
            let delay = policy.delay(attempt);
            assert!(delay >= base);
            assert!(delay <= base.mul_f64(1.0 + policy.jitter));
        }
    }

    #[test]
    fn test_enqueue_assigns_token_and_dedupes() {
        let mut outbox = Outbox::new(policy());
        let now = Instant::now();
        let board = Uuid::new_v4();

        let generated = outbox.enqueue(NewComment::new(board, "hi"), now);
        assert!(!generated.is_empty());

        let token = outbox.enqueue(NewComment::new(board, "again").with_client_id("c1"), now);
        assert_eq!(token, "c1");
        outbox.enqueue(NewComment::new(board, "again").with_client_id("c1"), now);
        assert_eq!(outbox.len(), 2);
    }

    #[test]
    fn test_transient_failure_retries_with_same_token() {
        let mut outbox = Outbox::new(policy());
        let now = Instant::now();
        outbox.enqueue(NewComment::new(Uuid::new_v4(), "hi").with_client_id("c1"), now);

        let sent = outbox.ready(now);
        assert_eq!(sent.len(), 1);
        assert!(outbox.ready(now).is_empty());

        let action = outbox.mark_failed("c1", ClientError::Timeout, now);
        assert_eq!(action, Some(FailureAction::Retry { at: now + Duration::from_secs(1) }));
        assert!(outbox.ready(now).is_empty());

        let retried = outbox.ready(now + Duration::from_secs(1));
        assert_eq!(retried[0].client_message_id.as_deref(), Some("c1"));

        assert!(outbox.mark_sent("c1"));
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let mut outbox = Outbox::new(policy());
        let mut now = Instant::now();
        outbox.enqueue(NewComment::new(Uuid::new_v4(), "hi").with_client_id("c1"), now);

        for _ in 0..4 {
            outbox.ready(now);
            assert_matches!(
                outbox.mark_failed("c1", ClientError::Transport("reset".into()), now),
                Some(FailureAction::Retry { at }) => now = at
            );
        }
        outbox.ready(now);
        assert_matches!(
            outbox.mark_failed("c1", ClientError::Transport("reset".into()), now),
            Some(FailureAction::GiveUp { .. })
        );
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_terminal_failure_gives_up_immediately() {
        let mut outbox = Outbox::new(policy());
        let now = Instant::now();
        outbox.enqueue(NewComment::new(Uuid::new_v4(), "hi").with_client_id("c1"), now);
        outbox.ready(now);

        let rejected = ClientError::Rejected { status: 403, message: "Forbidden".into() };
        assert_eq!(
            outbox.mark_failed("c1", rejected.clone(), now),
            Some(FailureAction::GiveUp { error: rejected })
        );
    }

    #[test]
    fn test_reconnect_makes_waiting_entries_due() {
        let mut outbox = Outbox::new(policy());
        let now = Instant::now();
        outbox.enqueue(NewComment::new(Uuid::new_v4(), "hi").with_client_id("c1"), now);
        outbox.ready(now);
        outbox.mark_failed("c1", ClientError::Timeout, now);
        assert_eq!(outbox.next_due(now), Some(Duration::from_secs(1)));

        outbox.on_reconnect(now);
        assert_eq!(outbox.next_due(now), Some(Duration::ZERO));
        assert_eq!(outbox.ready(now).len(), 1);
    }
}
