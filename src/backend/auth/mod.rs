//! Viewer authentication.
//!
//! Accounts and sign-in live outside this service; requests carry a bearer
//! token whose subject is the user id.

/// Token creation and verification
pub mod sessions;

pub use sessions::{create_token, verify_token, Claims};
