//! Comment ingestion.
//!
//! # Overview
//!
//! [`CommentIngestion`] is the create path for comments. The default
//! implementation, [`RealtimeIngestion`], runs these steps:
//!
//! 1. Validate the body (trim, length) before touching the store.
//! 2. Resolve the author's context. The author must be an active member,
//!    `ADMIN_ONLY` needs admin rights, and anonymous posting needs the
//!    board toggle unless the author is an admin. Violations are rejected,
//!    never downgraded.
//! 3. If a client token is supplied and a comment with that token already
//!    exists on the board, return it unchanged (replay).
//! 4. Otherwise insert the comment and update the board's last-activity
//!    summary in one transaction. A unique violation on the token means a
//!    concurrent request won the race: roll back, re-read, and replay.
//! 5. On a fresh insert, publish the message and activity events.
//! 6. Always acknowledge a token-bearing request to the author's sockets.
//!
//! Fan-out happens after commit and its failures are only logged.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::backend::boards::{db as boards_db, require_active_member};
use crate::backend::comments::db;
use crate::backend::error::BackendError;
use crate::backend::realtime::{BoardEvent, ConnectionManager};
use crate::shared::board::Board;
use crate::shared::clock;
use crate::shared::comment::{AuthoredComment, Comment, NewComment, Visibility};
use crate::shared::event::{AckPayload, ServerFrame};
use crate::shared::membership::ViewerContext;

/// Result of a create request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOutcome {
    pub comment: AuthoredComment,
    /// `false` when an existing comment was returned for a repeated token
    pub created_new: bool,
}

/// Create path for comments
#[async_trait]
pub trait CommentIngestion: Send + Sync {
    async fn create_comment(
        &self,
        author_id: Uuid,
        request: NewComment,
    ) -> Result<CreateOutcome, BackendError>;
}

/// Store-backed ingestion that fans out to the board's realtime channel
#[derive(Clone)]
pub struct RealtimeIngestion {
    pool: SqlitePool,
    connections: ConnectionManager,
}

impl RealtimeIngestion {
    pub fn new(pool: SqlitePool, connections: ConnectionManager) -> Self {
        Self { pool, connections }
    }

    /// Insert, or recover the row that won a concurrent insert
    async fn insert_or_replay(&self, comment: Comment) -> Result<CreateOutcome, BackendError> {
        let mut tx = self.pool.begin().await?;

        match db::insert_comment(&mut *tx, &comment).await {
            Ok(()) => {}
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                tx.rollback().await?;
                let Some(client_id) = comment.client_id.as_deref() else {
                    return Err(BackendError::Database(sqlx::Error::Database(err)));
                };
                tracing::debug!(
                    "[Comments] Token {} raced on board {}, re-reading winner",
                    client_id,
                    comment.board_id
                );
                let existing = db::find_by_client_id(&self.pool, comment.board_id, client_id)
                    .await?
                    .ok_or(sqlx::Error::RowNotFound)?;
                return Ok(CreateOutcome {
                    comment: existing,
                    created_new: false,
                });
            }
            Err(err) => return Err(err.into()),
        }

        db::record_board_activity(&mut *tx, &comment).await?;
        let author_name = boards_db::get_display_name(&mut *tx, comment.author_id)
            .await?
            .unwrap_or_else(|| "Unknown".to_string());
        tx.commit().await?;

        Ok(CreateOutcome {
            comment: AuthoredComment {
                comment,
                author_name,
            },
            created_new: true,
        })
    }

    fn fan_out(&self, board: &Board, outcome: &CreateOutcome) {
        let stored = &outcome.comment.comment;

        if outcome.created_new {
            let shared = Arc::new(outcome.comment.clone());
            let reached = self
                .connections
                .publish(board.id, BoardEvent::activity(&board.invite_code, shared.clone()));
            self.connections
                .publish(board.id, BoardEvent::message(&board.invite_code, shared));
            tracing::info!(
                "[Comments] Comment {} on board {} published to {} subscribers",
                stored.id,
                board.id,
                reached
            );
        }

        if let Some(client_id) = &stored.client_id {
            let ack = ServerFrame::MessageAck(AckPayload {
                board_code: board.invite_code.clone(),
                client_id: client_id.clone(),
                id: stored.id,
                created_at: stored.created_at,
            });
            let delivered = self.connections.send_to_user(stored.author_id, &ack);
            if delivered == 0 {
                tracing::debug!("[Comments] No open connection for ack of {}", client_id);
            }
        }
    }
}

/// Check the author's rights for this request
pub fn authorize(board: &Board, author: &ViewerContext, request: &NewComment) -> Result<(), BackendError> {
    if request.visibility == Visibility::AdminOnly && !author.is_admin {
        return Err(BackendError::forbidden("Only admins can post ADMIN_ONLY comments"));
    }
    if request.anonymous && !board.anonymous_enabled && !author.is_admin {
        return Err(BackendError::forbidden("Anonymous posting is disabled on this board"));
    }
    Ok(())
}

#[async_trait]
impl CommentIngestion for RealtimeIngestion {
    async fn create_comment(
        &self,
        author_id: Uuid,
        request: NewComment,
    ) -> Result<CreateOutcome, BackendError> {
        let (content, client_id) = request.normalized()?;

        let (board, author) = require_active_member(&self.pool, author_id, request.board_id).await?;
        authorize(&board, &author, &request)?;

        if let Some(token) = client_id.as_deref() {
            if let Some(existing) = db::find_by_client_id(&self.pool, board.id, token).await? {
                tracing::debug!("[Comments] Replaying comment {} for token {}", existing.comment.id, token);
                let outcome = CreateOutcome {
                    comment: existing,
                    created_new: false,
                };
                self.fan_out(&board, &outcome);
                return Ok(outcome);
            }
        }

        let comment = Comment {
            id: Uuid::now_v7(),
            board_id: board.id,
            author_id,
            content,
            visibility: request.visibility,
            anonymous: request.anonymous,
            client_id,
            created_at: clock::now(),
        };

        let outcome = self.insert_or_replay(comment).await?;
        if outcome.created_new {
            tracing::info!(
                "[Comments] Created comment {} on board {}",
                outcome.comment.comment.id,
                board.id
            );
        }
        self.fan_out(&board, &outcome);
        Ok(outcome)
    }
}
