use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// A transcript segment annotated with an inferred speaker role after
/// reconciling it with diarization output. Idempotently upserted keyed
/// by (session_id, chunk_index, start_time_ms, end_time_ms).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerSegment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub session_id: ObjectId,
    pub chunk_index: i32,
    #[serde(default)]
    pub speaker: Speaker,
    pub text: String,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub confidence: f64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Stylist,
    Customer,
    #[default]
    Unknown,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::Stylist => "stylist",
            Speaker::Customer => "customer",
            Speaker::Unknown => "unknown",
        }
    }
}

impl SpeakerSegment {
    pub const COLLECTION: &'static str = "speaker_segments";
}
