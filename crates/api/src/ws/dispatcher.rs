use async_trait::async_trait;
use axum::extract::ws::Message;
use bson::oid::ObjectId;
use futures::SinkExt;
use std::sync::Arc;
use stylecoach_services::SessionBroadcaster;
use tracing::{debug, warn};

use super::storage::WsStorage;

/// Sends a JSON message to every connection subscribed to the session.
pub async fn broadcast(
    ws_storage: &WsStorage,
    session_id: &ObjectId,
    message: &serde_json::Value,
) {
    let text = match serde_json::to_string(message) {
        Ok(t) => t,
        Err(e) => {
            warn!(%session_id, %e, "Failed to serialize WS message");
            return;
        }
    };

    for sender in ws_storage.get_senders(session_id) {
        let text = text.clone();
        let mut guard = sender.lock().await;
        if let Err(e) = guard.send(Message::text(text)).await {
            warn!(%session_id, %e, "Failed to send WS message");
        } else {
            debug!(%session_id, "WS message sent");
        }
    }
}

/// Pipeline-facing broadcaster: wraps events in the `{type, data}`
/// envelope clients expect and fans them out over the WS registry.
pub struct WsBroadcaster {
    ws_storage: Arc<WsStorage>,
}

impl WsBroadcaster {
    pub fn new(ws_storage: Arc<WsStorage>) -> Self {
        Self { ws_storage }
    }
}

#[async_trait]
impl SessionBroadcaster for WsBroadcaster {
    async fn broadcast(&self, session_id: ObjectId, event: &str, payload: serde_json::Value) {
        let message = serde_json::json!({
            "type": event,
            "data": payload,
        });
        broadcast(&self.ws_storage, &session_id, &message).await;
    }
}
