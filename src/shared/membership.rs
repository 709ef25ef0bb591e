//! Membership and viewer context.
//!
//! A [`ViewerContext`] is the resolved answer to "what may this user see on
//! this board": whether they are an active member, whether they hold admin
//! rights, and, for members who left, the instant after which nothing new
//! is visible to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::shared::board::Board;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Member => "MEMBER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ADMIN" => Some(Role::Admin),
            "MEMBER" => Some(Role::Member),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipStatus {
    Active,
    Left,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Active => "ACTIVE",
            MembershipStatus::Left => "LEFT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(MembershipStatus::Active),
            "LEFT" => Some(MembershipStatus::Left),
            _ => None,
        }
    }
}

/// One user's relationship to one board.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub user_id: Uuid,
    pub board_id: Uuid,
    pub role: Role,
    pub status: MembershipStatus,
    pub pinned: bool,
    /// Set when `status` is `Left`
    pub left_at: Option<DateTime<Utc>>,
}

/// The user has no membership row for the board at all.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("user {user_id} is not a member of board {board_id}")]
pub struct NotAMember {
    pub user_id: Uuid,
    pub board_id: Uuid,
}

/// Resolved read/write rights of a user on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerContext {
    pub viewer_id: Uuid,
    pub board_id: Uuid,
    /// Membership is currently active
    pub is_member: bool,
    /// Creator or ADMIN role, and only while active
    pub is_admin: bool,
    /// For members who left: the last instant they may still see
    pub left_cutoff: Option<DateTime<Utc>>,
}

impl ViewerContext {
    /// Resolve a viewer's context from the board and their membership row.
    ///
    /// A user with no membership row is rejected even if they created the
    /// board. A member who left keeps read access up to `left_at` and loses
    /// admin rights.
    pub fn resolve(
        viewer_id: Uuid,
        board: &Board,
        membership: Option<&Membership>,
    ) -> Result<Self, NotAMember> {
        let membership = membership.ok_or(NotAMember {
            user_id: viewer_id,
            board_id: board.id,
        })?;

        let context = match membership.status {
            MembershipStatus::Active => ViewerContext {
                viewer_id,
                board_id: board.id,
                is_member: true,
                is_admin: board.creator_id == viewer_id || membership.role == Role::Admin,
                left_cutoff: None,
            },
            MembershipStatus::Left => ViewerContext {
                viewer_id,
                board_id: board.id,
                is_member: false,
                is_admin: false,
                // A LEFT row without a timestamp hides everything.
                left_cutoff: Some(membership.left_at.unwrap_or(DateTime::<Utc>::MIN_UTC)),
            },
        };
        Ok(context)
    }

    pub fn is_active(&self) -> bool {
        self.is_member && self.left_cutoff.is_none()
    }
}
