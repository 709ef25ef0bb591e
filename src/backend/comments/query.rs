//! Typed comment query builder.
//!
//! A [`CommentFilter`] can only be built from a [`ViewerContext`], so the
//! visibility clause and the leave cutoff are always part of the query.
//! They are pushed as separate `AND (...)` groups ahead of the position
//! clause, which keeps them from being widened by a later `OR`.

use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

use crate::shared::clock;
use crate::shared::comment::Visibility;
use crate::shared::cursor::{PageRequest, Window};
use crate::shared::membership::ViewerContext;

pub(crate) const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.board_id, c.author_id, c.content, c.visibility, c.anonymous,
           c.client_id, c.created_at,
           COALESCE(u.display_name, 'Unknown') AS author_name
    FROM comments c
    LEFT JOIN users u ON u.id = c.author_id
"#;

/// `visibility = EVERYONE OR author = viewer OR (admin AND visibility = ADMIN_ONLY)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityClause {
    pub viewer_id: Uuid,
    pub is_admin: bool,
}

/// `created_at <= cutoff`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutoffClause(pub chrono::DateTime<chrono::Utc>);

/// Validated comment query for one viewer on one board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentFilter {
    board_id: Uuid,
    visibility: VisibilityClause,
    cutoff: Option<CutoffClause>,
    page: PageRequest,
}

impl CommentFilter {
    pub fn for_viewer(context: &ViewerContext, page: PageRequest) -> Self {
        Self {
            board_id: context.board_id,
            visibility: VisibilityClause {
                viewer_id: context.viewer_id,
                is_admin: context.is_admin,
            },
            cutoff: context.left_cutoff.map(CutoffClause),
            page,
        }
    }

    pub fn page(&self) -> &PageRequest {
        &self.page
    }

    /// Whether rows come back newest first and must be reversed
    pub fn selects_descending(&self) -> bool {
        matches!(self.page.window, Window::Before(_) | Window::Latest { .. })
    }

    pub fn build(&self) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::<Sqlite>::new(COMMENT_SELECT);

        qb.push(" WHERE c.board_id = ").push_bind(self.board_id);

        let VisibilityClause { viewer_id, is_admin } = self.visibility;
        qb.push(" AND (c.visibility = ")
            .push_bind(Visibility::Everyone.as_str())
            .push(" OR c.author_id = ")
            .push_bind(viewer_id)
            .push(" OR (")
            .push_bind(is_admin)
            .push(" AND c.visibility = ")
            .push_bind(Visibility::AdminOnly.as_str())
            .push("))");

        if let Some(CutoffClause(cutoff)) = self.cutoff {
            qb.push(" AND (c.created_at <= ")
                .push_bind(clock::to_micros(cutoff))
                .push(")");
        }

        match self.page.window {
            Window::After(cursor) => {
                let at = clock::to_micros(cursor.created_at);
                qb.push(" AND (c.created_at > ")
                    .push_bind(at)
                    .push(" OR (c.created_at = ")
                    .push_bind(at)
                    .push(" AND c.id > ")
                    .push_bind(cursor.id)
                    .push("))");
                qb.push(" ORDER BY c.created_at ASC, c.id ASC LIMIT ")
                    .push_bind(i64::from(self.page.limit));
            }
            Window::Before(cursor) => {
                let at = clock::to_micros(cursor.created_at);
                qb.push(" AND (c.created_at < ")
                    .push_bind(at)
                    .push(" OR (c.created_at = ")
                    .push_bind(at)
                    .push(" AND c.id < ")
                    .push_bind(cursor.id)
                    .push("))");
                qb.push(" ORDER BY c.created_at DESC, c.id DESC LIMIT ")
                    .push_bind(i64::from(self.page.limit));
            }
            Window::Since(at) => {
                qb.push(" AND (c.created_at > ")
                    .push_bind(clock::to_micros(at))
                    .push(")");
                qb.push(" ORDER BY c.created_at ASC, c.id ASC LIMIT ")
                    .push_bind(i64::from(self.page.limit));
            }
            Window::Latest { offset } => {
                qb.push(" ORDER BY c.created_at DESC, c.id DESC LIMIT ")
                    .push_bind(i64::from(self.page.limit))
                    .push(" OFFSET ")
                    .push_bind(i64::from(offset));
            }
        }

        qb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::cursor::Cursor;

    fn context(left: bool) -> ViewerContext {
        ViewerContext {
            viewer_id: Uuid::new_v4(),
            board_id: Uuid::new_v4(),
            is_member: !left,
            is_admin: false,
            left_cutoff: left.then(clock::now),
        }
    }

    #[test]
    fn test_visibility_clause_always_present() {
        let qb = CommentFilter::for_viewer(&context(false), PageRequest::latest()).build();
        let sql = qb.sql();
        assert!(sql.contains("c.visibility = ?"));
        assert!(sql.contains("c.author_id = ?"));
        assert!(!sql.contains("c.created_at <= ?"));
    }

    #[test]
    fn test_cutoff_clause_for_left_member() {
        let qb = CommentFilter::for_viewer(&context(true), PageRequest::latest()).build();
        let sql = qb.sql();
        assert!(sql.contains("AND (c.created_at <= ?)"));
    }

    #[test]
    fn test_cutoff_precedes_position_clause() {
        let page = PageRequest::after(Cursor::start_of(clock::now()), None);
        let qb = CommentFilter::for_viewer(&context(true), page).build();
        let sql = qb.sql();
        let cutoff = sql.find("c.created_at <= ?").unwrap();
        let position = sql.find("c.created_at > ?").unwrap();
        assert!(cutoff < position);
        assert!(sql.contains("ORDER BY c.created_at ASC, c.id ASC"));
    }

    #[test]
    fn test_backward_windows_select_descending() {
        let before = PageRequest::before(Cursor::end_of(clock::now()), None);
        assert!(CommentFilter::for_viewer(&context(false), before).selects_descending());
        let since = PageRequest::since(clock::now());
        assert!(!CommentFilter::for_viewer(&context(false), since).selects_descending());
    }
}
