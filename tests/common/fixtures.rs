//! Board fixtures
//!
//! A board with an admin creator, two plain members and an outsider who
//! never joined.

use sqlx::SqlitePool;
use uuid::Uuid;

use boardsync::backend::boards::db;
use boardsync::shared::board::Board;

pub struct BoardFixture {
    pub board: Board,
    pub admin: Uuid,
    pub member: Uuid,
    pub other_member: Uuid,
    pub outsider: Uuid,
}

impl BoardFixture {
    pub async fn create(pool: &SqlitePool, anonymous_enabled: bool) -> Self {
        let admin = db::create_user(pool, "Admin").await.expect("create admin");
        let member = db::create_user(pool, "A").await.expect("create member");
        let other_member = db::create_user(pool, "C").await.expect("create other member");
        let outsider = db::create_user(pool, "Outsider").await.expect("create outsider");

        let code = format!("B-{}", &Uuid::new_v4().simple().to_string()[..8]);
        let board = db::create_board(pool, "Board B", &code, admin, anonymous_enabled)
            .await
            .expect("create board");
        db::join_board(pool, member, board.id).await.expect("join member");
        db::join_board(pool, other_member, board.id)
            .await
            .expect("join other member");

        Self {
            board,
            admin,
            member,
            other_member,
            outsider,
        }
    }

    pub fn code(&self) -> &str {
        &self.board.invite_code
    }
}

/// JSON body for `POST /comments`
pub fn comment_body(board_id: Uuid, content: &str) -> serde_json::Value {
    serde_json::json!({
        "boardId": board_id,
        "content": content,
        "visibility": "EVERYONE",
        "anonymous": false,
    })
}
