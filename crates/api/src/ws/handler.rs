use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use rollbook_core::error::CoreError;
use rollbook_core::scope::RequestContext;
use rollbook_core::types::{Date, DbId};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::RangeParams;
use crate::state::AppState;
use crate::ws::manager::WsSender;
use crate::ws::watch::error_message;

/// `?token=` -- browsers cannot set headers on a WebSocket handshake.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: String,
}

/// Inbound client frames.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    WatchReport {
        room_id: Option<DbId>,
        from: Option<Date>,
        to: Option<Date>,
        preset: Option<String>,
        today: Option<Date>,
    },
    UnwatchReport,
}

/// HTTP handler that authenticates and upgrades the connection to WebSocket.
///
/// The token is checked before the upgrade so an invalid one gets a plain
/// 401 response.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let user = AuthUser::from_token(&params.token, &state.config.jwt)?;
    let ctx = user.ctx();
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, ctx)))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Registers the connection, forwards outbound messages from a spawned
/// sender task, dispatches inbound frames, and cleans up on disconnect.
async fn handle_socket(socket: WebSocket, state: AppState, ctx: RequestContext) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(
        conn_id = %conn_id,
        company_id = ctx.company_id,
        user_id = ctx.user_id,
        "WebSocket connected"
    );

    let (tx, mut rx) = state.ws_manager.add(conn_id.clone(), ctx).await;

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(Message::Text(text)) => {
                handle_client_message(&state, &conn_id, ctx, &tx, text.as_str()).await;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    state.report_watches.stop(&conn_id).await;
    state.ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}

async fn handle_client_message(
    state: &AppState,
    conn_id: &str,
    ctx: RequestContext,
    tx: &WsSender,
    text: &str,
) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            let _ = tx.send(error_message(&CoreError::Validation(format!(
                "Unrecognized message: {e}"
            ))));
            return;
        }
    };

    match message {
        ClientMessage::WatchReport {
            room_id,
            from,
            to,
            preset,
            today,
        } => {
            let params = RangeParams {
                room_id,
                from,
                to,
                preset,
                today,
            };
            let started = match params.resolve(state.engine.week_start()) {
                Ok(range) => {
                    state
                        .report_watches
                        .start(
                            conn_id,
                            ctx,
                            params.room_filter(),
                            range,
                            state.engine.clone(),
                            tx.clone(),
                        )
                        .await
                }
                Err(e) => Err(e),
            };
            if let Err(e) = started {
                let _ = tx.send(error_message(&e));
            }
        }
        ClientMessage::UnwatchReport => {
            state.report_watches.stop(conn_id).await;
        }
    }
}
