//! WebSocket handler
//!
//! Handles WebSocket connections and message processing.

use crate::connection::{Connection, ConnectionState, OutboundFrame};
use crate::handlers::MessageDispatcher;
use crate::protocol::{CloseCode, GatewayMessage, HelloPayload};
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use huddle_realtime::PresenceTracker;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// Missed heartbeat intervals before the connection counts as dead
const HEARTBEAT_TIMEOUT_FACTOR: u32 = 2;

/// Channel buffer size for outgoing messages
const MESSAGE_BUFFER_SIZE: usize = 100;

/// How long the writer gets to flush a close frame
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// WebSocket gateway handler
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(state, socket))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket) {
    let session_id = Connection::generate_session_id();
    let heartbeat_interval_ms = state.config().gateway.heartbeat_interval_ms;

    let (tx, mut rx) = mpsc::channel::<OutboundFrame>(MESSAGE_BUFFER_SIZE);
    let connection = state
        .connection_manager()
        .add_connection(session_id.clone(), tx);

    tracing::info!(session_id = %session_id, "WebSocket connection established");

    let (mut ws_sink, mut ws_stream) = socket.split();

    let hello = GatewayMessage::hello(HelloPayload::with_interval(heartbeat_interval_ms));
    if let Ok(json) = hello.to_json() {
        if ws_sink.send(Message::Text(json)).await.is_err() {
            tracing::warn!(session_id = %session_id, "Failed to send Hello message");
            cleanup_connection(&state, &session_id, &connection).await;
            return;
        }
    }

    let state_recv = state.clone();
    let session_id_recv = session_id.clone();
    let connection_recv = connection.clone();

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if let Err(close_code) =
                        handle_text_message(&state_recv, &connection_recv, &text).await
                    {
                        return Some(close_code);
                    }
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(session_id = %session_id_recv, "Binary messages not supported");
                    return Some(CloseCode::DecodeError);
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {}
                Ok(Message::Close(_)) => {
                    tracing::info!(session_id = %session_id_recv, "Client closed connection");
                    return None;
                }
                Err(e) => {
                    tracing::warn!(session_id = %session_id_recv, error = %e, "WebSocket error");
                    return None;
                }
            }
        }
        None
    });

    let session_id_send = session_id.clone();

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame {
                OutboundFrame::Message(msg) => {
                    let Ok(json) = msg.to_json() else {
                        continue;
                    };
                    if ws_sink.send(Message::Text(json)).await.is_err() {
                        tracing::warn!(
                            session_id = %session_id_send,
                            "Failed to send message to WebSocket"
                        );
                        break;
                    }
                }
                OutboundFrame::Close(code) => {
                    let (code, reason) = GatewayMessage::close_frame(code);
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    if ws_sink.send(Message::Close(Some(frame))).await.is_err() {
                        tracing::debug!(session_id = %session_id_send, "Close frame not delivered");
                    }
                    break;
                }
            }
        }

        if ws_sink.close().await.is_err() {
            tracing::trace!(session_id = %session_id_send, "Socket already closed");
        }
    });

    let session_id_hb = session_id.clone();
    let connection_hb = connection.clone();
    let interval_ms = heartbeat_interval_ms.max(1);

    let mut heartbeat_task = tokio::spawn(async move {
        let timeout = Duration::from_millis(interval_ms) * HEARTBEAT_TIMEOUT_FACTOR;
        let mut check_interval = interval(Duration::from_millis(interval_ms / 2 + 1));

        loop {
            check_interval.tick().await;

            let time_since = connection_hb.time_since_heartbeat();
            if time_since > timeout {
                tracing::warn!(
                    session_id = %session_id_hb,
                    time_since_ms = time_since.as_millis(),
                    "Connection timed out (no heartbeat)"
                );
                break;
            }
        }
    });

    let close_code = tokio::select! {
        result = &mut recv_task => result.ok().flatten(),
        _ = &mut send_task => None,
        _ = &mut heartbeat_task => Some(CloseCode::SessionTimeout),
    };
    recv_task.abort();
    heartbeat_task.abort();

    cleanup_connection(&state, &session_id, &connection).await;

    match close_code {
        Some(code) => {
            tracing::debug!(session_id = %session_id, close_code = %code, "Closing connection");
            connection.close(code).await;
            drop(connection);
            if tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, send_task)
                .await
                .is_err()
            {
                tracing::debug!(session_id = %session_id, "Writer did not finish in time");
            }
        }
        None => send_task.abort(),
    }
}

/// Handle a text message from the client
async fn handle_text_message(
    state: &GatewayState,
    connection: &Arc<Connection>,
    text: &str,
) -> Result<(), CloseCode> {
    let message = match GatewayMessage::from_json(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(
                session_id = %connection.session_id(),
                error = %e,
                "Failed to parse message"
            );
            return Err(CloseCode::DecodeError);
        }
    };

    tracing::trace!(
        session_id = %connection.session_id(),
        op = %message.op,
        "Received message"
    );

    match MessageDispatcher::dispatch(state, connection, message).await {
        Ok(Some(close_code)) => Err(close_code),
        Ok(None) => Ok(()),
        Err(e) => {
            tracing::warn!(
                session_id = %connection.session_id(),
                error = %e,
                "Handler error"
            );
            Err(e.to_close_code())
        }
    }
}

/// Drop the connection from every index; the user goes offline with their last socket
/// on this node.
///
/// Other nodes are not consulted. In Redis mode a user still connected elsewhere
/// reads as offline until that socket's next heartbeat marks them online again.
async fn cleanup_connection(state: &GatewayState, session_id: &str, connection: &Arc<Connection>) {
    tracing::info!(session_id = %session_id, "Cleaning up connection");

    connection.set_state(ConnectionState::Disconnected);

    let Some(removed) = state.connection_manager().remove_connection(session_id) else {
        return;
    };

    for channel in removed.emptied_channels {
        state.sync_channel(channel);
    }

    if let (Some(identity), true) = (removed.identity, removed.last_user_session) {
        if let Err(e) = PresenceTracker::new(state.realtime())
            .mark_offline(&identity.user)
            .await
        {
            tracing::warn!(user_id = %identity.user.id, error = %e, "Presence not cleared on disconnect");
        } else {
            tracing::debug!(user_id = %identity.user.id, "User presence set to offline");
        }
    }
}
