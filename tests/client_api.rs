//! Client against a mocked comment API
//!
//! Covers status mapping in `BoardApi` and the session's send and catch-up
//! paths over real HTTP.

use std::time::Instant;

use assert_matches::assert_matches;
use chrono::{DateTime, Duration, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use boardsync::client::{BoardApi, ClientError, ClientSession, Config, EntryStatus, FailureAction, PostedComment};
use boardsync::shared::clock;
use boardsync::shared::comment::{CommentView, NewComment, Visibility};
use boardsync::shared::config::AppConfig;
use boardsync::shared::cursor::{CommentPage, Cursor, ListCommentsQuery};
use boardsync::shared::event::ServerFrame;

const TOKEN: &str = "test-token";

/// Matches requests carrying a query parameter, whatever its value
struct HasParam(&'static str);

impl Match for HasParam {
    fn matches(&self, request: &Request) -> bool {
        request.url.query_pairs().any(|(key, _)| key == self.0)
    }
}

fn config_for(server: &MockServer) -> Config {
    Config::with_builder(AppConfig::builder().server_url(server.uri()))
        .unwrap()
        .with_token(TOKEN)
}

fn view(board_id: Uuid, id: u128, at: DateTime<Utc>, text: &str) -> CommentView {
    CommentView {
        id: Uuid::from_u128(id),
        board_id,
        text: text.to_string(),
        visibility: Visibility::Everyone,
        displayed_sender: "B".to_string(),
        actual_sender: None,
        sender_id: None,
        anonymous: false,
        created_at: clock::truncate(at),
        client_message_id: None,
    }
}

fn page_json(comments: Vec<CommentView>, has_more: Option<bool>) -> serde_json::Value {
    serde_json::to_value(CommentPage {
        comments,
        cursor: None,
        cursor_id: None,
        has_more,
    })
    .unwrap()
}

#[tokio::test]
async fn test_post_reports_created_or_replayed() {
    let server = MockServer::start().await;
    let board_id = Uuid::new_v4();
    let mut stored = view(board_id, 1, Utc::now(), "hi");
    stored.client_message_id = Some("c1".to_string());

    Mock::given(method("POST"))
        .and(path("/comments"))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .and(body_partial_json(json!({ "clientMessageId": "c1", "content": "hi" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(&stored))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&stored))
        .mount(&server)
        .await;

    let api = BoardApi::new(config_for(&server)).unwrap();
    let request = NewComment::new(board_id, "hi").with_client_id("c1");

    let first = api.post_comment(&request).await.unwrap();
    assert!(first.created_new);
    assert_eq!(first.comment, stored);

    let second = api.post_comment(&request).await.unwrap();
    assert!(!second.created_new);
    assert_eq!(second.comment.id, first.comment.id);
}

#[tokio::test]
async fn test_error_statuses_map_to_client_errors() {
    let server = MockServer::start().await;
    let forbidden = Uuid::new_v4();
    let missing = Uuid::new_v4();
    let broken = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path(format!("/comments/{}", forbidden)))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({ "error": "Not a member of this board", "status": 403 })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/comments/{}", missing)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "Board not found" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/comments/{}", broken)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let api = BoardApi::new(config_for(&server)).unwrap();
    let query = ListCommentsQuery::default();

    let err = api.list_comments(forbidden, &query).await.unwrap_err();
    assert_eq!(
        err,
        ClientError::Rejected {
            status: 403,
            message: "Not a member of this board".to_string()
        }
    );
    assert!(err.is_terminal());

    assert_eq!(api.list_comments(missing, &query).await.unwrap_err(), ClientError::NotFound);

    let err = api.list_comments(broken, &query).await.unwrap_err();
    assert_matches!(err, ClientError::Transport(_));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_list_sends_cursor_query() {
    let server = MockServer::start().await;
    let board_id = Uuid::new_v4();
    let cursor_id = Uuid::from_u128(7);

    Mock::given(method("GET"))
        .and(path(format!("/comments/{}", board_id)))
        .and(query_param("cursorId", cursor_id.to_string().as_str()))
        .and(query_param("limit", "2"))
        .and(HasParam("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(
            vec![view(board_id, 8, Utc::now(), "next")],
            Some(false),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let api = BoardApi::new(config_for(&server)).unwrap();
    let query = ListCommentsQuery::after(Cursor::new(clock::now(), cursor_id), Some(2));
    let page = api.list_comments(board_id, &query).await.unwrap();

    assert_eq!(page.comments.len(), 1);
    assert_eq!(page.has_more, Some(false));
}

#[tokio::test]
async fn test_missing_token_fails_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let config = Config::with_builder(AppConfig::builder().server_url(server.uri())).unwrap();
    let api = BoardApi::new(config).unwrap();
    let err = api
        .post_comment(&NewComment::new(Uuid::new_v4(), "hi"))
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::NotAuthenticated);
}

#[tokio::test]
async fn test_flush_confirms_optimistic_entry() {
    let server = MockServer::start().await;
    let board_id = Uuid::new_v4();
    let viewer = Uuid::new_v4();
    let mut stored = view(board_id, 42, Utc::now(), "hello");
    stored.displayed_sender = "Me".to_string();
    stored.sender_id = Some(viewer);
    stored.client_message_id = Some("c1".to_string());

    Mock::given(method("POST"))
        .and(path("/comments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(&stored))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let api = BoardApi::new(config.clone()).unwrap();
    let mut session = ClientSession::new(viewer, "Me", &config);
    session.follow_board(board_id, "ABC", false);

    let client_id = session
        .compose(NewComment::new(board_id, "hello").with_client_id("c1"), Instant::now())
        .unwrap();
    assert_eq!(client_id, "c1");
    assert!(session.timeline(board_id).unwrap().entries()[0].is_pending());

    assert_eq!(session.flush_outbox(&api).await, 1);

    let timeline = session.timeline(board_id).unwrap();
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline.entries()[0].status, EntryStatus::Confirmed);
    assert_eq!(timeline.entries()[0].server_id, Some(stored.id));
    assert!(session.outbox().is_empty());
}

#[tokio::test]
async fn test_flush_keeps_entry_pending_on_server_error() {
    let server = MockServer::start().await;
    let board_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/comments"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let api = BoardApi::new(config.clone()).unwrap();
    let mut session = ClientSession::new(Uuid::new_v4(), "Me", &config);
    session.follow_board(board_id, "ABC", false);
    session
        .compose(NewComment::new(board_id, "hello"), Instant::now())
        .unwrap();

    assert_eq!(session.flush_outbox(&api).await, 0);
    assert_eq!(session.outbox().len(), 1);
    assert!(session.timeline(board_id).unwrap().entries()[0].is_pending());
}

#[tokio::test]
async fn test_rejected_send_is_marked_failed() {
    let server = MockServer::start().await;
    let board_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/comments"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "error": "Only admins may post ADMIN_ONLY comments" })))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let api = BoardApi::new(config.clone()).unwrap();
    let mut session = ClientSession::new(Uuid::new_v4(), "Me", &config);
    session.follow_board(board_id, "ABC", false);
    let client_id = session
        .compose(
            NewComment::new(board_id, "secret").with_visibility(Visibility::AdminOnly),
            Instant::now(),
        )
        .unwrap();

    let request = NewComment::new(board_id, "secret").with_client_id(client_id.clone());
    let result = api.post_comment(&request).await;
    let action = session.send_result(board_id, &client_id, result, Instant::now());

    assert_matches!(action, Some(FailureAction::GiveUp { error: ClientError::Rejected { status: 403, .. } }));
    let entry = session.timeline(board_id).unwrap().find_by_client_id(&client_id).unwrap();
    assert_eq!(entry.status, EntryStatus::Failed);
}

#[tokio::test]
async fn test_catch_up_follows_full_forward_pages() {
    let server = MockServer::start().await;
    let board_id = Uuid::new_v4();
    let base = clock::truncate(Utc::now() - Duration::minutes(10));

    // Initial load: default window
    Mock::given(method("GET"))
        .and(path(format!("/comments/{}", board_id)))
        .and(query_param_is_missing("since"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(
            vec![view(board_id, 1, base, "first")],
            Some(false),
        )))
        .expect(1)
        .mount(&server)
        .await;

    // Page after the pulled entry comes back full
    let full: Vec<_> = (0..100)
        .map(|i| view(board_id, 100 + i as u128, base + Duration::milliseconds(i + 1), "burst"))
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/comments/{}", board_id)))
        .and(query_param("cursorId", Uuid::from_u128(1).to_string().as_str()))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(full, Some(true))))
        .expect(1)
        .mount(&server)
        .await;

    // So the client continues from the last row of that page
    Mock::given(method("GET"))
        .and(path(format!("/comments/{}", board_id)))
        .and(HasParam("cursor"))
        .and(query_param("cursorId", Uuid::from_u128(199).to_string().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(
            vec![view(board_id, 500, base + Duration::seconds(5), "tail")],
            Some(false),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let api = BoardApi::new(config.clone()).unwrap();
    let mut session = ClientSession::new(Uuid::new_v4(), "Me", &config);
    session.follow_board(board_id, "ABC", false);

    assert_eq!(session.catch_up(&api, board_id).await.unwrap(), 1);
    assert_eq!(
        session.catch_up_query(board_id),
        ListCommentsQuery::after(Cursor::new(base, Uuid::from_u128(1)), Some(100))
    );

    assert_eq!(session.catch_up(&api, board_id).await.unwrap(), 101);
    let timeline = session.timeline(board_id).unwrap();
    assert_eq!(timeline.len(), 102);
    assert_eq!(timeline.entries().last().map(|e| e.text.as_str()), Some("tail"));
}

#[tokio::test]
async fn test_reconnect_catch_up_covers_comments_missed_before_own_send() {
    let server = MockServer::start().await;
    let board_id = Uuid::new_v4();
    let me = Uuid::new_v4();
    let t0 = clock::truncate(Utc::now() - Duration::minutes(5));
    let t1 = t0 + Duration::seconds(1);
    let t2 = t0 + Duration::seconds(2);

    let seen = view(board_id, 10, t0, "seen before going offline");
    // Same microsecond as the last pulled row, later in id order
    let tie = view(board_id, 11, t0, "tie");
    let missed = view(board_id, 12, t1, "missed while offline");
    let mut own = view(board_id, 13, t2, "mine");
    own.sender_id = Some(me);
    own.displayed_sender = "Me".to_string();
    own.client_message_id = Some("c1".to_string());

    Mock::given(method("GET"))
        .and(path(format!("/comments/{}", board_id)))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(vec![seen.clone()], Some(false))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/comments/{}", board_id)))
        .and(query_param("cursorId", seen.id.to_string().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(
            vec![tie.clone(), missed.clone(), own.clone()],
            Some(false),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let api = BoardApi::new(config.clone()).unwrap();
    let mut session = ClientSession::new(me, "Me", &config);
    session.follow_board(board_id, "ABC", false);
    let effect = session.handle_frame(ServerFrame::joined("ABC")).await;
    assert_eq!(effect.catch_up, Some(board_id));
    assert_eq!(session.catch_up(&api, board_id).await.unwrap(), 1);

    // Offline: compose, then the send goes through over HTTP on reconnect
    session.on_disconnect();
    let token = session
        .compose(NewComment::new(board_id, "mine").with_client_id("c1"), Instant::now())
        .unwrap();
    session.on_reconnect(Instant::now());
    let posted = PostedComment {
        comment: own.clone(),
        created_new: true,
    };
    assert_eq!(session.send_result(board_id, &token, Ok(posted), Instant::now()), None);
    assert_eq!(
        session.timeline(board_id).unwrap().find_by_client_id("c1").unwrap().status,
        EntryStatus::Confirmed
    );

    let effect = session.handle_frame(ServerFrame::joined("ABC")).await;
    assert_eq!(effect.catch_up, Some(board_id));
    let query = session.catch_up_query(board_id);
    assert_eq!(query, ListCommentsQuery::after(Cursor::new(t0, seen.id), Some(100)));
    assert!(query.since.is_none());

    assert_eq!(session.catch_up(&api, board_id).await.unwrap(), 2);
    let timeline = session.timeline(board_id).unwrap();
    let texts: Vec<_> = timeline.entries().iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["seen before going offline", "tie", "missed while offline", "mine"]);
    assert_eq!(
        session.catch_up_query(board_id),
        ListCommentsQuery::after(Cursor::new(t2, own.id), Some(100))
    );
}

#[tokio::test]
async fn test_catch_up_surfaces_forbidden() {
    let server = MockServer::start().await;
    let board_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path(format!("/comments/{}", board_id)))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "error": "Not a member of this board" })))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let api = BoardApi::new(config.clone()).unwrap();
    let mut session = ClientSession::new(Uuid::new_v4(), "Me", &config);
    session.follow_board(board_id, "ABC", false);

    let err = session.catch_up(&api, board_id).await.unwrap_err();
    assert!(err.is_terminal());
    assert!(session.timeline(board_id).unwrap().is_empty());
}
