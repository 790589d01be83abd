use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

use super::analysis::AnalysisMetrics;

/// Post-session coaching report. Created once when the session ends,
/// from the latest chunk's metric snapshot plus a full-transcript
/// summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub session_id: ObjectId,
    pub summary: String,
    pub overall_score: i32,
    pub metrics: Option<AnalysisMetrics>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub action_items: Vec<String>,
    pub feedback: Option<String>,
    pub generated_at: DateTime,
}

impl SessionReport {
    pub const COLLECTION: &'static str = "session_reports";
}
