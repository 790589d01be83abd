//! Session broadcast seam. Pipeline stages publish realtime events on a
//! per-session topic (`session:{id}`); the API layer implements this
//! over its WebSocket registry. Broadcasting is fire-and-forget: stages
//! never fail because no one is listening.

use async_trait::async_trait;
use bson::oid::ObjectId;

pub const EVENT_SCORE_UPDATE: &str = "score_update";
pub const EVENT_SIMILAR_CASES: &str = "similar_cases";
pub const EVENT_ALERT: &str = "alert";
pub const EVENT_NOTIFICATION: &str = "notification";

#[async_trait]
pub trait SessionBroadcaster: Send + Sync {
    async fn broadcast(&self, session_id: ObjectId, event: &str, payload: serde_json::Value);
}

/// Drops every event; used in contexts with no realtime consumers.
pub struct NullBroadcaster;

#[async_trait]
impl SessionBroadcaster for NullBroadcaster {
    async fn broadcast(&self, _session_id: ObjectId, _event: &str, _payload: serde_json::Value) {}
}
