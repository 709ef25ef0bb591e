//! Realtime board channels
//!
//! - **`broadcast`** - board events and per-subscriber rendering
//! - **`connections`** - socket registry and per-board broadcast channels
//! - **`socket`** - the `/ws` handler and join/leave handling

pub mod broadcast;
pub mod connections;
pub mod socket;

pub use broadcast::{broadcast_event, BoardEvent, Subscriber};
pub use connections::{ConnectionId, ConnectionManager};
pub use socket::handle_board_socket;
