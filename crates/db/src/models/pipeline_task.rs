use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// Durable unit of pipeline work, keyed uniquely by (session_id, stage).
/// Handlers are idempotent so at-least-once delivery is safe; a sweeper
/// re-runs rows stranded in pending/processing by a crashed worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineTask {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub session_id: ObjectId,
    pub stage: PipelineStage,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub attempts: u32,
    pub error: Option<String>,
    pub started_at: Option<DateTime>,
    pub completed_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Report,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Report => "report",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl PipelineTask {
    pub const COLLECTION: &'static str = "pipeline_tasks";
}
