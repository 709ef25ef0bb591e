//! Cursor pagination types.
//!
//! Comments on a board are totally ordered by `(created_at, id)`. A cursor
//! is a position in that order; the forward cursor returned with a page is
//! the key of its last row.
//!
//! [`ListCommentsQuery`] is the raw query string; [`PageRequest`] is the
//! validated window the store runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::comment::CommentView;
use crate::shared::error::SharedError;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;

/// A position in the `(created_at, id)` total order.
///
/// Field order matters: the derived `Ord` compares `created_at` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub created_at: DateTime<Utc>,
    pub id: Uuid,
}

impl Cursor {
    pub fn new(created_at: DateTime<Utc>, id: Uuid) -> Self {
        Self { created_at, id }
    }

    /// Sorts after every row that shares `created_at`.
    pub fn end_of(created_at: DateTime<Utc>) -> Self {
        Self::new(created_at, Uuid::from_u128(u128::MAX))
    }

    /// Sorts before every row that shares `created_at`.
    pub fn start_of(created_at: DateTime<Utc>) -> Self {
        Self::new(created_at, Uuid::nil())
    }
}

/// Which slice of the ordered comment stream to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Rows strictly after the cursor, ascending
    After(Cursor),
    /// Rows strictly before the cursor; selected descending, returned ascending
    Before(Cursor),
    /// Rows with `created_at` strictly after the instant; delta mode
    Since(DateTime<Utc>),
    /// Newest rows skipping `offset` from the end; not stable under inserts
    Latest { offset: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub window: Window,
    pub limit: u32,
}

impl PageRequest {
    pub fn latest() -> Self {
        Self {
            window: Window::Latest { offset: 0 },
            limit: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn after(cursor: Cursor, limit: Option<u32>) -> Self {
        Self {
            window: Window::After(cursor),
            limit: clamp_limit(limit),
        }
    }

    pub fn before(cursor: Cursor, limit: Option<u32>) -> Self {
        Self {
            window: Window::Before(cursor),
            limit: clamp_limit(limit),
        }
    }

    pub fn since(at: DateTime<Utc>) -> Self {
        Self {
            window: Window::Since(at),
            limit: MAX_PAGE_SIZE,
        }
    }

    pub fn is_delta(&self) -> bool {
        matches!(self.window, Window::Since(_))
    }
}

/// Default when absent, hard cap when too large, never zero.
pub fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// Query string of `GET /comments/{board_id}`.
///
/// Precedence: `since`, then `before`, then `cursor`, then `offset`.
/// `cursorId` pins the position inside a timestamp; without it `before`
/// excludes the whole instant and `cursor` skips past it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCommentsQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl ListCommentsQuery {
    pub fn after(cursor: Cursor, limit: Option<u32>) -> Self {
        Self {
            cursor: Some(cursor.created_at),
            cursor_id: Some(cursor.id),
            limit,
            ..Self::default()
        }
    }

    pub fn before(cursor: Cursor, limit: Option<u32>) -> Self {
        Self {
            before: Some(cursor.created_at),
            cursor_id: Some(cursor.id),
            limit,
            ..Self::default()
        }
    }

    pub fn since(at: DateTime<Utc>) -> Self {
        Self {
            since: Some(at),
            ..Self::default()
        }
    }

    pub fn to_page_request(&self) -> Result<PageRequest, SharedError> {
        if self.limit == Some(0) {
            return Err(SharedError::validation("limit", "limit must be at least 1"));
        }
        if self.cursor_id.is_some() && self.cursor.is_none() && self.before.is_none() {
            return Err(SharedError::validation(
                "cursorId",
                "cursorId requires cursor or before",
            ));
        }

        if let Some(since) = self.since {
            return Ok(PageRequest::since(since));
        }
        if let Some(before) = self.before {
            let cursor = match self.cursor_id {
                Some(id) => Cursor::new(before, id),
                None => Cursor::start_of(before),
            };
            return Ok(PageRequest::before(cursor, self.limit));
        }
        if let Some(after) = self.cursor {
            let cursor = match self.cursor_id {
                Some(id) => Cursor::new(after, id),
                None => Cursor::end_of(after),
            };
            return Ok(PageRequest::after(cursor, self.limit));
        }
        Ok(PageRequest {
            window: Window::Latest {
                offset: self.offset.unwrap_or(0),
            },
            limit: clamp_limit(self.limit),
        })
    }
}

/// Response of `GET /comments/{board_id}`.
///
/// In delta mode only `comments` is serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPage {
    pub comments: Vec<CommentView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
}

impl CommentPage {
    /// Build a paginated response. `has_more` is `true` iff the page is full,
    /// which can report one extra empty page at the end of the stream.
    pub fn paginated(comments: Vec<CommentView>, limit: u32) -> Self {
        let last = comments.last().map(|c| Cursor::new(c.created_at, c.id));
        let has_more = comments.len() == limit as usize;
        Self {
            comments,
            cursor: last.map(|c| c.created_at),
            cursor_id: last.map(|c| c.id),
            has_more: Some(has_more),
        }
    }

    pub fn delta(comments: Vec<CommentView>) -> Self {
        Self {
            comments,
            ..Self::default()
        }
    }

    /// Forward cursor for the next page, if the page was non-empty.
    pub fn next_cursor(&self) -> Option<Cursor> {
        match (self.cursor, self.cursor_id) {
            (Some(at), Some(id)) => Some(Cursor::new(at, id)),
            _ => None,
        }
    }

    /// Cursor for paging further back in history.
    pub fn first_cursor(&self) -> Option<Cursor> {
        self.comments.first().map(|c| Cursor::new(c.created_at, c.id))
    }
}
