//! Board API Client
//!
//! Async calls to the comment endpoints. Every call is bounded by the
//! configured request timeout and reports failure to the caller; nothing
//! here retries on its own.

use reqwest::{Client, Response, StatusCode};
use uuid::Uuid;

use crate::client::config::Config;
use crate::client::error::ClientError;
use crate::shared::comment::{CommentView, NewComment};
use crate::shared::cursor::{CommentPage, ListCommentsQuery};

/// Result of a successful create call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedComment {
    pub comment: CommentView,
    /// `false` when the server replayed an earlier create with the same token
    pub created_new: bool,
}

#[derive(Debug, Clone)]
pub struct BoardApi {
    config: Config,
    client: Client,
}

impl BoardApi {
    pub fn new(config: Config) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn token(&self) -> Result<&str, ClientError> {
        self.config.get_token().ok_or(ClientError::NotAuthenticated)
    }

    /// `POST /comments`
    pub async fn post_comment(&self, request: &NewComment) -> Result<PostedComment, ClientError> {
        let url = self.config.api_url("/comments");
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token()?)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let response = check_status(response).await?;
        let comment = response.json::<CommentView>().await?;
        tracing::debug!("[Sync] Posted comment {} ({})", comment.id, status);

        Ok(PostedComment {
            comment,
            created_new: status == StatusCode::CREATED,
        })
    }

    /// `GET /comments/{board_id}`
    pub async fn list_comments(
        &self,
        board_id: Uuid,
        query: &ListCommentsQuery,
    ) -> Result<CommentPage, ClientError> {
        let url = self.config.api_url(&format!("/comments/{}", board_id));
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.token()?)
            .query(query)
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json::<CommentPage>().await?)
    }
}

async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| body.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| status.to_string());

    match status {
        StatusCode::NOT_FOUND => Err(ClientError::NotFound),
        s if s.is_server_error() => Err(ClientError::Transport(format!("{}: {}", s, message))),
        s => Err(ClientError::Rejected {
            status: s.as_u16(),
            message,
        }),
    }
}
