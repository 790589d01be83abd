use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub salon_id: ObjectId,
    pub stylist_id: ObjectId,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub customer_info: CustomerInfo,
    pub started_at: DateTime,
    pub ended_at: Option<DateTime>,
    pub total_duration_ms: Option<i64>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Advances monotonically (recording -> processing -> analyzing ->
/// completed); `error` is reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Recording,
    Processing,
    Analyzing,
    Completed,
    Error,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Recording => "recording",
            SessionStatus::Processing => "processing",
            SessionStatus::Analyzing => "analyzing",
            SessionStatus::Completed => "completed",
            SessionStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: Option<String>,
    pub age_group: Option<String>,
    pub gender: Option<String>,
    #[serde(default)]
    pub visit_type: VisitType,
    pub notes: Option<String>,
}

impl Default for CustomerInfo {
    fn default() -> Self {
        Self {
            name: None,
            age_group: None,
            gender: None,
            visit_type: VisitType::Repeat,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VisitType {
    New,
    #[default]
    Repeat,
}

impl Session {
    pub const COLLECTION: &'static str = "sessions";
}
