use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// Per-chunk scored analysis. One row per (session_id, chunk_index),
/// append-only. The metric sub-documents keep the camelCase key names of
/// the AI collaborator's JSON contract so the same types serve as wire
/// format and stored document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkAnalysis {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub session_id: ObjectId,
    pub chunk_index: i32,
    /// 0-100, always recomputed locally from the weighted sub-scores.
    pub overall_score: i32,
    pub metrics: AnalysisMetrics,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetrics {
    pub talk_ratio: TalkRatioDetail,
    pub question_quality: QuestionQualityDetail,
    pub emotion: EmotionDetail,
    pub concern_keywords: ConcernKeywordsDetail,
    pub proposal_timing: ProposalTimingDetail,
    pub proposal_quality: ProposalQualityDetail,
    pub conversion: ConversionDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TalkRatioDetail {
    pub score: f64,
    pub stylist_ratio: f64,
    pub customer_ratio: f64,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionQualityDetail {
    pub score: f64,
    pub open_count: u32,
    pub closed_count: u32,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionDetail {
    pub score: f64,
    pub positive_ratio: f64,
    #[serde(default)]
    pub negative_ratio: f64,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcernKeywordsDetail {
    pub score: f64,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalTimingDetail {
    pub score: f64,
    /// Time from concern detection to proposal; None when no proposal
    /// was made in this chunk.
    pub timing_ms: Option<i64>,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalQualityDetail {
    pub score: f64,
    #[serde(default)]
    pub match_rate: f64,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionDetail {
    pub score: f64,
    #[serde(default)]
    pub is_converted: bool,
    #[serde(default)]
    pub details: String,
}

impl ChunkAnalysis {
    pub const COLLECTION: &'static str = "chunk_analyses";
}
