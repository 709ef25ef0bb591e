//! Viewer-scoped comment listing.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::backend::boards::resolve_viewer;
use crate::backend::comments::db;
use crate::backend::comments::query::CommentFilter;
use crate::backend::error::BackendError;
use crate::shared::cursor::{CommentPage, PageRequest};
use crate::shared::visibility::project;

/// List a board's comments as `viewer_id` may see them
///
/// Members who left keep read access to history up to their leave time.
/// The store applies the visibility filter; projection runs again per row
/// so that sender masking is computed in one place.
pub async fn list_comments_for_viewer(
    pool: &SqlitePool,
    viewer_id: Uuid,
    board_id: Uuid,
    page: PageRequest,
) -> Result<CommentPage, BackendError> {
    let (_, context) = resolve_viewer(pool, viewer_id, board_id).await?;

    let filter = CommentFilter::for_viewer(&context, page);
    let rows = db::fetch_comments(pool, &filter).await?;

    let views = rows
        .iter()
        .filter_map(|row| project(row, context.viewer_id, context.is_admin))
        .collect::<Vec<_>>();

    tracing::debug!(
        "[Comments] Listed {} comments on board {} for {}",
        views.len(),
        board_id,
        viewer_id
    );

    if page.is_delta() {
        Ok(CommentPage::delta(views))
    } else {
        Ok(CommentPage::paginated(views, page.limit))
    }
}
