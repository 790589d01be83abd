use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// Raw transcript produced by the on-device transcription collaborator.
/// Times are session-relative seconds; immutable once written, upserted
/// by (session_id, chunk_index).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub session_id: ObjectId,
    pub chunk_index: i32,
    pub text: String,
    pub start_time_sec: f64,
    pub end_time_sec: f64,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    pub audio_url: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

fn default_confidence() -> f64 {
    1.0
}

impl TranscriptSegment {
    pub const COLLECTION: &'static str = "transcripts";
}
