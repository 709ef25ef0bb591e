//! # Board Client
//!
//! Native client side of the board channel: keeps a local view of each
//! followed board convergent with the server despite dropped pushes,
//! retried sends and reconnects.
//!
//! ## Architecture
//!
//! - **Timeline**: one merge function for optimistic, pushed, acked and pulled comments
//! - **Channel**: per-board `Unsubscribed -> Joining -> Subscribed` tracking
//! - **Outbox**: send queue with exponential backoff
//! - **Poller**: debounced liveness poll when push goes quiet
//! - **Activity**: unread counters and sidebar summaries
//! - **Session**: ties the above together for one signed-in user
//!
//! ## Key Components
//!
//! - `api.rs`: HTTP calls to the comment endpoints
//! - `timeline.rs`: `BoardTimeline` and `SyncEvent`
//! - `channel.rs`: `ChannelTracker`
//! - `outbox.rs`: `Outbox` and `BackoffPolicy`
//! - `poller.rs`: `LivenessPoller` and `PollTask`
//! - `activity.rs`: `UnreadCounters`
//! - `session.rs`: `ClientSession`

pub mod activity;
pub mod api;
pub mod channel;
pub mod config;
pub mod error;
pub mod outbox;
pub mod poller;
pub mod session;
pub mod timeline;

pub use activity::{BoardSummary, UnreadCounters};
pub use api::{BoardApi, PostedComment};
pub use channel::{ChannelState, ChannelTracker};
pub use config::Config;
pub use error::ClientError;
pub use outbox::{BackoffPolicy, FailureAction, Outbox};
pub use poller::{LivenessPoller, PollTask};
pub use session::{ClientSession, FrameEffect};
pub use timeline::{BoardTimeline, EntryStatus, LocalComment, SyncEvent, TimelineEntry};
