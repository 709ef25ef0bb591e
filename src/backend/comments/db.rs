//! Database operations for comments

use sqlx::{SqliteExecutor, SqlitePool};
use uuid::Uuid;

use crate::backend::comments::query::{CommentFilter, COMMENT_SELECT};
use crate::backend::storage;
use crate::shared::clock;
use crate::shared::comment::{AuthoredComment, Comment, Visibility};

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    board_id: Uuid,
    author_id: Uuid,
    content: String,
    visibility: String,
    anonymous: bool,
    client_id: Option<String>,
    created_at: i64,
    author_name: String,
}

impl TryFrom<CommentRow> for AuthoredComment {
    type Error = sqlx::Error;

    fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
        Ok(AuthoredComment {
            comment: Comment {
                id: row.id,
                board_id: row.board_id,
                author_id: row.author_id,
                content: row.content,
                visibility: storage::enum_column(&row.visibility, "visibility", Visibility::from_str)?,
                anonymous: row.anonymous,
                client_id: row.client_id,
                created_at: storage::timestamp(row.created_at, "created_at")?,
            },
            author_name: row.author_name,
        })
    }
}

/// Look up a comment by its idempotency token
pub async fn find_by_client_id(
    executor: impl SqliteExecutor<'_>,
    board_id: Uuid,
    client_id: &str,
) -> Result<Option<AuthoredComment>, sqlx::Error> {
    let row = sqlx::query_as::<_, CommentRow>(&format!(
        "{} WHERE c.board_id = ? AND c.client_id = ?",
        COMMENT_SELECT
    ))
    .bind(board_id)
    .bind(client_id)
    .fetch_optional(executor)
    .await?;
    row.map(AuthoredComment::try_from).transpose()
}

/// Insert a comment row
///
/// Fails with a unique violation when `(board_id, client_id)` already exists.
pub async fn insert_comment(
    executor: impl SqliteExecutor<'_>,
    comment: &Comment,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO comments (id, board_id, author_id, content, visibility, anonymous, client_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(comment.id)
    .bind(comment.board_id)
    .bind(comment.author_id)
    .bind(&comment.content)
    .bind(comment.visibility.as_str())
    .bind(comment.anonymous)
    .bind(comment.client_id.as_deref())
    .bind(clock::to_micros(comment.created_at))
    .execute(executor)
    .await?;
    Ok(())
}

/// Update the board's denormalized last-activity summary
pub async fn record_board_activity(
    executor: impl SqliteExecutor<'_>,
    comment: &Comment,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE boards
        SET last_activity_at = ?,
            last_comment_preview = ?,
            last_comment_visibility = ?,
            last_comment_anonymous = ?,
            last_sender_id = ?
        WHERE id = ?
        "#,
    )
    .bind(clock::to_micros(comment.created_at))
    .bind(comment.preview())
    .bind(comment.visibility.as_str())
    .bind(comment.anonymous)
    .bind(comment.author_id)
    .bind(comment.board_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Run a viewer-scoped comment query; rows come back in ascending order
pub async fn fetch_comments(
    pool: &SqlitePool,
    filter: &CommentFilter,
) -> Result<Vec<AuthoredComment>, sqlx::Error> {
    let mut qb = filter.build();
    let rows = qb.build_query_as::<CommentRow>().fetch_all(pool).await?;

    let mut comments = rows
        .into_iter()
        .map(AuthoredComment::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    if filter.selects_descending() {
        comments.reverse();
    }
    Ok(comments)
}

pub async fn count_comments(pool: &SqlitePool, board_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE board_id = ?")
        .bind(board_id)
        .fetch_one(pool)
        .await
}
