//! WebSocket upgrade handler and per-connection event loop.

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use pushcast_common::id::{prefix, prefixed_ulid};

use crate::AppState;

use super::events::ClientFrame;
use super::transport::Outbound;

/// Close code for frames that are not a JSON `{"event", "data"}` object.
pub const CLOSE_INVALID_FRAME: u16 = 4000;

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(ws_upgrade))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    let session_id = prefixed_ulid(prefix::SESSION);
    let (ws_tx, ws_rx) = socket.split();

    // The outbound queue must exist before the gateway greets the session.
    let outbound = state.transport.attach(&session_id);
    tokio::spawn(write_frames(session_id.clone(), ws_tx, outbound));

    state.gateway.on_connect(&session_id).await;

    read_frames(&state, &session_id, ws_rx).await;

    state.gateway.on_disconnect(&session_id).await;
    state.transport.detach(&session_id);
}

/// Read client frames until the socket closes or sends something unparseable.
async fn read_frames(state: &AppState, session_id: &str, mut ws_rx: SplitStream<WebSocket>) {
    while let Some(msg) = ws_rx.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Binary(_)) => continue,
            Err(e) => {
                tracing::debug!(?e, %session_id, "ws read error");
                break;
            }
        };

        let frame: ClientFrame = match serde_json::from_str(&text) {
            Ok(frame) => frame,
            Err(_) => {
                let _ = state
                    .transport
                    .close(session_id, CLOSE_INVALID_FRAME, "Invalid JSON")
                    .await;
                break;
            }
        };

        state
            .gateway
            .on_client_event(session_id, &frame.event, frame.data)
            .await;
    }
}

/// Drain a session's outbound queue into its socket.
async fn write_frames(
    session_id: String,
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Outbound>,
) {
    while let Some(item) = outbound.recv().await {
        match item {
            Outbound::Frame(frame) => {
                let json = match serde_json::to_string(&*frame) {
                    Ok(json) => json,
                    Err(err) => {
                        tracing::warn!(%session_id, ?err, "failed to encode frame");
                        continue;
                    }
                };
                if ws_tx.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            Outbound::Close { code, reason } => {
                let _ = send_close(&mut ws_tx, code, reason).await;
                break;
            }
        }
    }
    tracing::debug!(%session_id, "writer finished");
}

/// Send a WebSocket close frame with a code and reason.
async fn send_close(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    code: u16,
    reason: &str,
) -> Result<(), axum::Error> {
    let close_msg = Message::Close(Some(CloseFrame {
        code,
        reason: reason.to_string().into(),
    }));
    ws_tx.send(close_msg).await
}
