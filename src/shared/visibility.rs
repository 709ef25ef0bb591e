//! Visibility projection.
//!
//! The single place that decides whether a viewer may see a comment and
//! which sender label they get. Both the list endpoint and the realtime
//! fan-out go through [`project`], so a comment reads the same whichever
//! path delivered it.
//!
//! # Rules
//!
//! - `EVERYONE` comments are visible to every viewer the caller passes in;
//!   membership and leave cutoffs are enforced before projection.
//! - `ADMIN_ONLY` comments are visible to admins and to their author.
//! - Anonymous comments display [`ANONYMOUS_LABEL`]. Admins additionally get
//!   the real name in `actual_sender`. The author sees their own name.

use uuid::Uuid;

use crate::shared::comment::{AuthoredComment, CommentView, Visibility, ANONYMOUS_LABEL};

/// Whether a viewer may see a comment with this visibility and author.
pub fn can_view(visibility: Visibility, author_id: Uuid, viewer_id: Uuid, is_admin: bool) -> bool {
    match visibility {
        Visibility::Everyone => true,
        Visibility::AdminOnly => is_admin || author_id == viewer_id,
    }
}

/// Project a stored comment for one viewer, or `None` if it is hidden.
pub fn project(authored: &AuthoredComment, viewer_id: Uuid, is_admin: bool) -> Option<CommentView> {
    let comment = &authored.comment;
    if !can_view(comment.visibility, comment.author_id, viewer_id, is_admin) {
        return None;
    }

    let is_author = comment.author_id == viewer_id;
    let (displayed_sender, actual_sender, sender_id) = if !comment.anonymous || is_author {
        (authored.author_name.clone(), None, Some(comment.author_id))
    } else if is_admin {
        (
            ANONYMOUS_LABEL.to_string(),
            Some(authored.author_name.clone()),
            Some(comment.author_id),
        )
    } else {
        (ANONYMOUS_LABEL.to_string(), None, None)
    };

    Some(CommentView {
        id: comment.id,
        board_id: comment.board_id,
        text: comment.content.clone(),
        visibility: comment.visibility,
        displayed_sender,
        actual_sender,
        sender_id,
        anonymous: comment.anonymous,
        created_at: comment.created_at,
        // The idempotency token only means something to the device that sent it.
        client_message_id: if is_author { comment.client_id.clone() } else { None },
    })
}

/// Client-side re-check of a view that arrived over the wire.
///
/// Masked senders carry no `sender_id`, so an admin-only view without one
/// is only acceptable for admins.
pub fn view_visible_to(view: &CommentView, viewer_id: Uuid, is_admin: bool) -> bool {
    match view.visibility {
        Visibility::Everyone => true,
        Visibility::AdminOnly => is_admin || view.sender_id == Some(viewer_id),
    }
}
