use axum::extract::ws::{Message, WebSocket};
use bson::oid::ObjectId;
use dashmap::DashMap;
use futures::stream::SplitSink;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Tracks active WebSocket connections by session. A session can have
/// several listeners (stylist tablet, salon dashboard).
pub struct WsStorage {
    connections: DashMap<ObjectId, Vec<(String, WsSender)>>,
}

impl WsStorage {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    pub fn add(&self, session_id: ObjectId, connection_id: String, sender: WsSender) {
        self.connections
            .entry(session_id)
            .or_default()
            .push((connection_id, sender));
    }

    pub fn remove(&self, session_id: &ObjectId, connection_id: &str) {
        if let Some(mut senders) = self.connections.get_mut(session_id) {
            senders.retain(|(id, _)| id != connection_id);
            if senders.is_empty() {
                drop(senders);
                self.connections.remove(session_id);
            }
        }
    }

    pub fn get_senders(&self, session_id: &ObjectId) -> Vec<WsSender> {
        self.connections
            .get(session_id)
            .map(|s| s.iter().map(|(_, sender)| sender.clone()).collect())
            .unwrap_or_default()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.iter().map(|r| r.value().len()).sum()
    }
}

impl Default for WsStorage {
    fn default() -> Self {
        Self::new()
    }
}
