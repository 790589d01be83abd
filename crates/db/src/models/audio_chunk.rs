use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// One ~60s slice of a recording session, the unit of diarization and
/// analysis. Failure of one chunk never invalidates the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioChunk {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub session_id: ObjectId,
    pub chunk_index: i32,
    pub audio_url: String,
    /// Offsets from session start.
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    #[serde(default)]
    pub status: ChunkStatus,
    pub diarization_job_id: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStatus {
    #[default]
    Pending,
    Uploading,
    Diarizing,
    Completed,
    Error,
}

impl ChunkStatus {
    pub fn is_resolved(&self) -> bool {
        matches!(self, ChunkStatus::Completed | ChunkStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkStatus::Pending => "pending",
            ChunkStatus::Uploading => "uploading",
            ChunkStatus::Diarizing => "diarizing",
            ChunkStatus::Completed => "completed",
            ChunkStatus::Error => "error",
        }
    }
}

impl AudioChunk {
    pub const COLLECTION: &'static str = "audio_chunks";
}
