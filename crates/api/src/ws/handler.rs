use axum::{
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use bson::oid::ObjectId;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub session_id: String,
}

/// `GET /ws?session_id=...` — subscribe to a session's realtime events
/// (score updates, alerts, similar cases, notifications).
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Result<Response, Response> {
    let session_id = ObjectId::parse_str(&params.session_id).map_err(|_| {
        Response::builder()
            .status(400)
            .body("Invalid session_id".into())
            .unwrap_or_default()
    })?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, session_id)))
}

async fn handle_socket(socket: WebSocket, state: AppState, session_id: ObjectId) {
    let connection_id = Uuid::new_v4().to_string();
    info!(%session_id, %connection_id, "WebSocket connected");

    let (sender, mut receiver) = socket.split();
    let sender = Arc::new(Mutex::new(sender));

    state
        .ws_storage
        .add(session_id, connection_id.clone(), sender.clone());

    {
        let msg = serde_json::json!({
            "type": "connected",
            "data": { "sessionId": session_id.to_hex() },
        });
        let text = serde_json::to_string(&msg).unwrap_or_default();
        let mut guard = sender.lock().await;
        let _ = guard.send(Message::text(text)).await;
    }

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_client_message(&sender, &session_id, &text).await;
            }
            Ok(Message::Ping(data)) => {
                let mut guard = sender.lock().await;
                let _ = guard.send(Message::Pong(data)).await;
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                warn!(%session_id, %connection_id, %e, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    state.ws_storage.remove(&session_id, &connection_id);
    info!(%session_id, %connection_id, "WebSocket disconnected");
}

async fn handle_client_message(
    sender: &super::storage::WsSender,
    session_id: &ObjectId,
    text: &str,
) {
    let parsed: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => return,
    };
    let msg_type = parsed.get("type").and_then(|t| t.as_str()).unwrap_or("");
    debug!(%session_id, msg_type, "WS message received");

    // The stream is server-push; the only inbound message is keepalive.
    if msg_type == "ping" {
        let pong = serde_json::json!({ "type": "pong" });
        let text = serde_json::to_string(&pong).unwrap_or_default();
        let mut guard = sender.lock().await;
        let _ = guard.send(Message::text(text)).await;
    }
}
