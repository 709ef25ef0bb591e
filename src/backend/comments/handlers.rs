/**
 * Comment HTTP Handlers
 *
 * - `POST /comments` - create a comment; 201 on creation, 200 on replay
 * - `GET /comments/{board_id}` - list comments visible to the viewer
 */

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::backend::comments::ingestion::CommentIngestion;
use crate::backend::comments::listing::list_comments_for_viewer;
use crate::backend::error::BackendError;
use crate::backend::middleware::Viewer;
use crate::shared::comment::{CommentView, NewComment};
use crate::shared::cursor::{CommentPage, ListCommentsQuery};
use crate::shared::visibility::project;

pub async fn create_comment(
    State(ingestion): State<Arc<dyn CommentIngestion>>,
    viewer: Viewer,
    Json(request): Json<NewComment>,
) -> Result<(StatusCode, Json<CommentView>), BackendError> {
    let outcome = ingestion.create_comment(viewer.user_id, request).await?;

    // The author always sees their own comment, named.
    let view = project(&outcome.comment, viewer.user_id, false)
        .ok_or_else(|| BackendError::forbidden("Comment is not visible to its author"))?;

    let status = if outcome.created_new {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(view)))
}

pub async fn list_comments(
    State(pool): State<SqlitePool>,
    viewer: Viewer,
    Path(board_id): Path<Uuid>,
    Query(query): Query<ListCommentsQuery>,
) -> Result<Json<CommentPage>, BackendError> {
    let page = query.to_page_request()?;
    let comments = list_comments_for_viewer(&pool, viewer.user_id, board_id, page).await?;
    Ok(Json(comments))
}
