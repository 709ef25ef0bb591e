//! Authentication test helpers
//!
//! Tokens are signed with the secret of `ServerConfig::for_tests`.

use uuid::Uuid;

use boardsync::backend::auth::sessions::create_token;
use boardsync::backend::ServerConfig;

/// Generate a bearer token the test server accepts
pub fn generate_test_token(user_id: Uuid) -> String {
    let secret = ServerConfig::for_tests().jwt_secret;
    create_token(&secret, user_id, None).expect("Failed to generate test token")
}

/// Create authorization header value
pub fn auth_header(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Authorization header value for a user
pub fn bearer_for(user_id: Uuid) -> String {
    auth_header(&generate_test_token(user_id))
}
