//! Database operations for users, boards and memberships
//!
//! Board and membership lifecycle is managed outside the comment service;
//! these functions exist so the service can resolve viewers and invite
//! codes, and so tests and tooling can set up fixtures.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor, SqlitePool};
use uuid::Uuid;

use crate::backend::storage;
use crate::shared::board::{Board, LastActivity};
use crate::shared::clock;
use crate::shared::comment::Visibility;
use crate::shared::membership::{Membership, MembershipStatus, Role};

const BOARD_COLUMNS: &str = r#"
    id, name, invite_code, creator_id, anonymous_enabled,
    last_activity_at, last_comment_preview, last_comment_visibility,
    last_comment_anonymous, last_sender_id
"#;

/// Create a user record
pub async fn create_user(pool: &SqlitePool, display_name: &str) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, display_name) VALUES (?, ?)")
        .bind(id)
        .bind(display_name)
        .execute(pool)
        .await?;
    Ok(id)
}

pub async fn get_display_name(
    executor: impl SqliteExecutor<'_>,
    user_id: Uuid,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT display_name FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

/// Create a board; the creator becomes an active admin member
pub async fn create_board(
    pool: &SqlitePool,
    name: &str,
    invite_code: &str,
    creator_id: Uuid,
    anonymous_enabled: bool,
) -> Result<Board, sqlx::Error> {
    let id = Uuid::new_v4();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO boards (id, name, invite_code, creator_id, anonymous_enabled)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(invite_code)
    .bind(creator_id)
    .bind(anonymous_enabled)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO memberships (user_id, board_id, role, status, pinned, left_at)
        VALUES (?, ?, 'ADMIN', 'ACTIVE', 0, NULL)
        "#,
    )
    .bind(creator_id)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Board {
        id,
        name: name.to_string(),
        invite_code: invite_code.to_string(),
        creator_id,
        anonymous_enabled,
        last_activity: None,
    })
}

pub async fn get_board(
    executor: impl SqliteExecutor<'_>,
    board_id: Uuid,
) -> Result<Option<Board>, sqlx::Error> {
    let row = sqlx::query(&format!("SELECT {} FROM boards WHERE id = ?", BOARD_COLUMNS))
        .bind(board_id)
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(board_from_row).transpose()
}

pub async fn find_board_by_code(
    executor: impl SqliteExecutor<'_>,
    invite_code: &str,
) -> Result<Option<Board>, sqlx::Error> {
    let row = sqlx::query(&format!("SELECT {} FROM boards WHERE invite_code = ?", BOARD_COLUMNS))
        .bind(invite_code)
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(board_from_row).transpose()
}

/// Join a board as a member, or re-activate a membership that had left
///
/// Re-joining keeps the existing role.
pub async fn join_board(
    pool: &SqlitePool,
    user_id: Uuid,
    board_id: Uuid,
) -> Result<Membership, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO memberships (user_id, board_id, role, status, pinned, left_at)
        VALUES (?, ?, 'MEMBER', 'ACTIVE', 0, NULL)
        ON CONFLICT (user_id, board_id)
        DO UPDATE SET status = 'ACTIVE', left_at = NULL
        "#,
    )
    .bind(user_id)
    .bind(board_id)
    .execute(pool)
    .await?;

    get_membership(pool, user_id, board_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Mark a membership as left at `at`; history after `at` is hidden from the user
pub async fn leave_board(
    pool: &SqlitePool,
    user_id: Uuid,
    board_id: Uuid,
    at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE memberships
        SET status = 'LEFT', left_at = ?, pinned = 0
        WHERE user_id = ? AND board_id = ? AND status = 'ACTIVE'
        "#,
    )
    .bind(clock::to_micros(clock::truncate(at)))
    .bind(user_id)
    .bind(board_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_role(
    pool: &SqlitePool,
    user_id: Uuid,
    board_id: Uuid,
    role: Role,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE memberships SET role = ? WHERE user_id = ? AND board_id = ?")
        .bind(role.as_str())
        .bind(user_id)
        .bind(board_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn get_membership(
    executor: impl SqliteExecutor<'_>,
    user_id: Uuid,
    board_id: Uuid,
) -> Result<Option<Membership>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT user_id, board_id, role, status, pinned, left_at
        FROM memberships
        WHERE user_id = ? AND board_id = ?
        "#,
    )
    .bind(user_id)
    .bind(board_id)
    .fetch_optional(executor)
    .await?;

    row.map(|r| {
        Ok(Membership {
            user_id: r.try_get("user_id")?,
            board_id: r.try_get("board_id")?,
            role: storage::enum_column(r.try_get::<&str, _>("role")?, "role", Role::from_str)?,
            status: storage::enum_column(
                r.try_get::<&str, _>("status")?,
                "status",
                MembershipStatus::from_str,
            )?,
            pinned: r.try_get("pinned")?,
            left_at: storage::optional_timestamp(r.try_get("left_at")?, "left_at")?,
        })
    })
    .transpose()
}

fn board_from_row(row: &SqliteRow) -> Result<Board, sqlx::Error> {
    let last_activity_at: Option<i64> = row.try_get("last_activity_at")?;
    let last_activity = match last_activity_at {
        Some(micros) => {
            let visibility: Option<String> = row.try_get("last_comment_visibility")?;
            let sender_id: Option<Uuid> = row.try_get("last_sender_id")?;
            Some(LastActivity {
                at: storage::timestamp(micros, "last_activity_at")?,
                preview: row
                    .try_get::<Option<String>, _>("last_comment_preview")?
                    .unwrap_or_default(),
                visibility: visibility
                    .as_deref()
                    .and_then(Visibility::from_str)
                    .unwrap_or_default(),
                anonymous: row
                    .try_get::<Option<bool>, _>("last_comment_anonymous")?
                    .unwrap_or(false),
                sender_id: sender_id.unwrap_or_else(Uuid::nil),
            })
        }
        None => None,
    };

    Ok(Board {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        invite_code: row.try_get("invite_code")?,
        creator_id: row.try_get("creator_id")?,
        anonymous_enabled: row.try_get("anonymous_enabled")?,
        last_activity,
    })
}
