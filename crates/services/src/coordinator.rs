//! Chunk analysis coordinator: turns a chunk's merged speaker segments
//! into a persisted seven-indicator analysis and pushes the realtime
//! events derived from it.
//!
//! The model reports raw measures; every deterministic indicator score
//! and the weighted overall are recomputed locally before anything is
//! stored or broadcast, so drift in the model's own arithmetic never
//! reaches a client.

use bson::oid::ObjectId;
use chrono::Utc;
use std::fmt::Write as _;
use std::sync::Arc;
use stylecoach_db::models::{ChunkAnalysis, SpeakerSegment};
use thiserror::Error;
use tracing::{info, warn};

use crate::ai::{AiError, ConversationAi};
use crate::alerts;
use crate::dao::base::DaoError;
use crate::dao::{AnalysisDao, SegmentDao};
use crate::events::{
    SessionBroadcaster, EVENT_ALERT, EVENT_SCORE_UPDATE, EVENT_SIMILAR_CASES,
};
use crate::scoring;
use crate::similarity::SimilarCaseClient;

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Dao(#[from] DaoError),
    #[error(transparent)]
    Ai(#[from] AiError),
}

#[derive(Debug)]
pub enum AnalyzeOutcome {
    /// No merged segments exist for the chunk yet; nothing was stored.
    NothingToAnalyze,
    Analyzed(ChunkAnalysis),
}

pub struct ChunkAnalyzer {
    segments: Arc<SegmentDao>,
    analyses: Arc<AnalysisDao>,
    ai: Arc<ConversationAi>,
    similar: Arc<SimilarCaseClient>,
    broadcaster: Arc<dyn SessionBroadcaster>,
}

impl ChunkAnalyzer {
    pub fn new(
        segments: Arc<SegmentDao>,
        analyses: Arc<AnalysisDao>,
        ai: Arc<ConversationAi>,
        similar: Arc<SimilarCaseClient>,
        broadcaster: Arc<dyn SessionBroadcaster>,
    ) -> Self {
        Self {
            segments,
            analyses,
            ai,
            similar,
            broadcaster,
        }
    }

    /// Analyzes one chunk end to end: fetch merged segments, run the
    /// model, rescore locally, upsert, broadcast. Re-running for the
    /// same chunk overwrites the stored analysis in place.
    pub async fn analyze(
        &self,
        session_id: ObjectId,
        chunk_index: i32,
    ) -> Result<AnalyzeOutcome, AnalyzeError> {
        let segments = self.segments.find_by_chunk(session_id, chunk_index).await?;
        if segments.is_empty() {
            info!(%session_id, chunk_index, "No merged segments; skipping analysis");
            return Ok(AnalyzeOutcome::NothingToAnalyze);
        }

        let conversation = format_transcript(&segments);
        let ai_result = self.ai.analyze_conversation(&conversation).await?;

        let mut metrics = ai_result.metrics;
        let overall_score = scoring::rescore(&mut metrics);

        let analysis = self
            .analyses
            .upsert(
                session_id,
                chunk_index,
                overall_score,
                &metrics,
                &ai_result.suggestions,
                &ai_result.highlights,
            )
            .await?;

        info!(%session_id, chunk_index, overall_score, "Chunk analysis stored");

        self.broadcaster
            .broadcast(
                session_id,
                EVENT_SCORE_UPDATE,
                serde_json::json!({
                    "sessionId": session_id.to_hex(),
                    "chunkIndex": chunk_index,
                    "overallScore": overall_score,
                    "metrics": {
                        "talkRatio": metrics.talk_ratio.score,
                        "questionQuality": metrics.question_quality.score,
                        "emotion": metrics.emotion.score,
                        "concernKeywords": metrics.concern_keywords.score,
                        "proposalTiming": metrics.proposal_timing.score,
                        "proposalQuality": metrics.proposal_quality.score,
                        "conversion": metrics.conversion.score,
                    },
                    "timestamp": Utc::now().to_rfc3339(),
                }),
            )
            .await;

        for alert in alerts::derive_alerts(overall_score, &metrics, chunk_index) {
            let payload = serde_json::to_value(&alert).unwrap_or_default();
            self.broadcaster
                .broadcast(session_id, EVENT_ALERT, payload)
                .await;
        }

        // Similar-case lookup rides on detected concerns and is strictly
        // best-effort.
        let keywords = metrics.concern_keywords.keywords.clone();
        if !keywords.is_empty() && self.similar.is_available() {
            let similar = Arc::clone(&self.similar);
            let broadcaster = Arc::clone(&self.broadcaster);
            tokio::spawn(async move {
                match similar.search(session_id, &keywords).await {
                    Ok(cases) if !cases.is_empty() => {
                        broadcaster
                            .broadcast(
                                session_id,
                                EVENT_SIMILAR_CASES,
                                serde_json::json!({
                                    "sessionId": session_id.to_hex(),
                                    "keywords": keywords,
                                    "cases": cases,
                                }),
                            )
                            .await;
                    }
                    Ok(_) => {}
                    Err(e) => warn!(%session_id, %e, "Similar-case search failed"),
                }
            });
        }

        Ok(AnalyzeOutcome::Analyzed(analysis))
    }
}

/// Renders merged segments as the speaker-labeled transcript the model
/// is prompted with, one utterance per line.
pub fn format_transcript(segments: &[SpeakerSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        let _ = writeln!(out, "[{}] {}", speaker_label(segment), segment.text);
    }
    out
}

fn speaker_label(segment: &SpeakerSegment) -> &'static str {
    use stylecoach_db::models::Speaker;
    match segment.speaker {
        Speaker::Stylist => "Stylist",
        Speaker::Customer => "Customer",
        Speaker::Unknown => "Unknown",
    }
}
