//! Viewer context resolution against the store.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::backend::boards::db;
use crate::backend::error::BackendError;
use crate::shared::board::Board;
use crate::shared::membership::ViewerContext;

/// Load a board and resolve what `viewer_id` may do on it
///
/// - board absent: `NotFound`
/// - no membership row: `NotAMember`
pub async fn resolve_viewer(
    pool: &SqlitePool,
    viewer_id: Uuid,
    board_id: Uuid,
) -> Result<(Board, ViewerContext), BackendError> {
    let board = db::get_board(pool, board_id)
        .await?
        .ok_or_else(|| BackendError::not_found("Board"))?;
    let membership = db::get_membership(pool, viewer_id, board_id).await?;
    let context = ViewerContext::resolve(viewer_id, &board, membership.as_ref())?;
    Ok((board, context))
}

/// Same as [`resolve_viewer`], addressing the board by invite code
pub async fn resolve_viewer_by_code(
    pool: &SqlitePool,
    viewer_id: Uuid,
    invite_code: &str,
) -> Result<(Board, ViewerContext), BackendError> {
    let board = db::find_board_by_code(pool, invite_code)
        .await?
        .ok_or_else(|| BackendError::not_found("Board"))?;
    let membership = db::get_membership(pool, viewer_id, board.id).await?;
    let context = ViewerContext::resolve(viewer_id, &board, membership.as_ref())?;
    Ok((board, context))
}

/// Resolve and require an active membership
pub async fn require_active_member(
    pool: &SqlitePool,
    viewer_id: Uuid,
    board_id: Uuid,
) -> Result<(Board, ViewerContext), BackendError> {
    let (board, context) = resolve_viewer(pool, viewer_id, board_id).await?;
    if !context.is_active() {
        return Err(BackendError::forbidden("Membership is no longer active"));
    }
    Ok((board, context))
}
