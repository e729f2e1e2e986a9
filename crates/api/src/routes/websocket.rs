use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use carelink_chat::{ClientEvent, ConnectionId, ServerEvent};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{error::ApiQuery, ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct WebSocketQuery {
    token: Option<String>,
}

/// Upgrade to the chat socket. A token is optional, but one that is
/// supplied must be valid and binds the socket to that account.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    ApiQuery(params): ApiQuery<WebSocketQuery>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let identity = match params.token.as_deref() {
        Some(token) => Some(state.authenticate(token).await?.public_id().to_string()),
        None => None,
    };
    if let Some(user) = &identity {
        tracing::debug!(%user, "authenticated socket upgrade");
    }

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, identity)))
}

async fn handle_socket(socket: WebSocket, state: AppState, identity: Option<String>) {
    let (mut ws_sender, mut receiver) = socket.split();
    let connection = ConnectionId::new();
    let hub = state.hub().clone();

    let (out_tx, mut out_rx) = mpsc::channel::<ServerEvent>(state.settings().outbound_buffer);
    hub.connect(connection, out_tx).await;
    if let Some(user) = identity {
        hub.bind_identity(connection, user).await;
    }

    let sender_task = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    tracing::error!(%connection, error = %err, "failed to encode socket event");
                    continue;
                }
            };
            if let Err(err) = ws_sender.send(Message::Text(json)).await {
                tracing::debug!(%connection, error = %err, "socket send failed");
                break;
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => hub.handle(connection, event).await,
                Err(err) => {
                    tracing::warn!(%connection, error = %err, "failed to parse client event");
                    hub.report_error(connection, "Invalid event format").await;
                }
            },
            Ok(Message::Close(_)) => break,
            Err(err) => {
                tracing::debug!(%connection, error = %err, "socket error");
                break;
            }
            _ => {}
        }
    }

    hub.disconnect(connection).await;
    sender_task.abort();
    tracing::debug!(%connection, "socket handler finished");
}
