/**
 * Board Channel Socket
 *
 * `GET /ws` upgrades to a WebSocket carrying board channel frames. One
 * socket can join any number of boards.
 *
 * # Lifecycle
 *
 * 1. The viewer is authenticated on upgrade.
 * 2. The connection is registered with the `ConnectionManager`, and a
 *    writer task drains its outbound queue into the socket.
 * 3. `join-board` resolves the invite code and the viewer's membership,
 *    subscribes, and answers `joined-room`, or `error` if the join is
 *    rejected. `leave-board` drops the subscription.
 * 4. When the socket closes, the connection and all its subscriptions are
 *    torn down.
 */

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use uuid::Uuid;

use crate::backend::boards::resolve_viewer_by_code;
use crate::backend::error::BackendError;
use crate::backend::middleware::Viewer;
use crate::backend::realtime::connections::ConnectionId;
use crate::backend::server::state::AppState;
use crate::shared::event::{ClientFrame, ServerFrame};

pub async fn handle_board_socket(
    State(state): State<AppState>,
    viewer: Viewer,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_connection(state, viewer.user_id, socket))
}

async fn run_connection(state: AppState, user_id: Uuid, socket: WebSocket) {
    let (connection_id, mut outbound) = state.connections.connect(user_id);
    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            let text = match frame.to_json() {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("[Socket] Failed to serialize {} frame: {}", frame.name(), e);
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                handle_client_frame(&state, connection_id, user_id, text.as_str()).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("[Socket] Connection {} transport error: {}", connection_id, e);
                break;
            }
        }
    }

    state.connections.disconnect(connection_id);
    writer.abort();
}

/// Handle one inbound frame; rejections are reported to the client as `error` frames
pub async fn handle_client_frame(state: &AppState, connection_id: ConnectionId, user_id: Uuid, text: &str) {
    let frame = match ClientFrame::parse(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!("[Socket] Unparseable frame on {}: {}", connection_id, e);
            state
                .connections
                .send_to(connection_id, ServerFrame::error("Unrecognized frame"));
            return;
        }
    };

    match frame {
        ClientFrame::JoinBoard(join) => {
            match join_board_channel(state, connection_id, user_id, &join.board_code).await {
                Ok(()) => {
                    state
                        .connections
                        .send_to(connection_id, ServerFrame::joined(join.board_code));
                }
                Err(e) => {
                    tracing::info!(
                        "[Socket] Join of {} by {} rejected: {}",
                        join.board_code,
                        user_id,
                        e
                    );
                    state
                        .connections
                        .send_to(connection_id, ServerFrame::join_rejected(join.board_code, e.message()));
                }
            }
        }
        ClientFrame::LeaveBoard(board) => {
            if let Ok((board, _)) = resolve_viewer_by_code(&state.pool, user_id, &board.board_code).await {
                state.connections.unsubscribe(connection_id, board.id);
            }
        }
    }
}

/// Subscribe a connection to a board by invite code
///
/// Only active members may subscribe; a member who left reads history
/// through the list endpoint instead.
pub async fn join_board_channel(
    state: &AppState,
    connection_id: ConnectionId,
    user_id: Uuid,
    board_code: &str,
) -> Result<(), BackendError> {
    let (board, context) = resolve_viewer_by_code(&state.pool, user_id, board_code).await?;
    if !context.is_active() {
        return Err(BackendError::forbidden("Membership is no longer active"));
    }
    if !state.connections.subscribe(connection_id, board.id, context.is_admin) {
        return Err(BackendError::not_found("Connection"));
    }
    Ok(())
}
