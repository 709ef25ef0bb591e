//! Test server setup
//!
//! Every `TestApp` owns a fresh in-memory SQLite database with migrations
//! applied, so tests never share state.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;
use uuid::Uuid;

use boardsync::backend::routes::create_router;
use boardsync::backend::server::init::build_state;
use boardsync::backend::{AppState, ServerConfig};

use super::auth_helpers::bearer_for;

/// Application state and router over a private in-memory database
pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        let state = build_state(ServerConfig::for_tests())
            .await
            .expect("Failed to build test state");
        let router = create_router(state.clone());
        Self { state, router }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.state.pool
    }

    /// Send a request as `user` (or anonymously) and decode the JSON body
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user: Option<Uuid>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, bearer_for(user));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        self.send(request).await
    }

    /// Send a prepared request
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn post_comment(&self, user: Uuid, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, "/comments", Some(user), Some(body)).await
    }

    pub async fn list_comments(&self, user: Uuid, board_id: Uuid, query: &str) -> (StatusCode, Value) {
        let uri = if query.is_empty() {
            format!("/comments/{}", board_id)
        } else {
            format!("/comments/{}?{}", board_id, query)
        };
        self.request(Method::GET, &uri, Some(user), None).await
    }
}

/// Count stored comments on a board, bypassing the API
pub async fn stored_comment_count(pool: &SqlitePool, board_id: Uuid) -> i64 {
    boardsync::backend::comments::db::count_comments(pool, board_id)
        .await
        .expect("Failed to count comments")
}
