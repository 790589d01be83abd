//! Post-session report synthesis.
//!
//! Runs when a session ends: takes the latest chunk's metric snapshot
//! plus the full speaker-labeled transcript, asks the AI collaborator
//! for a narrative report, and falls back to a deterministic rule-based
//! report when the collaborator is unavailable or misbehaves. The
//! overall score is always recomputed locally from the snapshot.

use bson::{DateTime, oid::ObjectId};
use std::sync::Arc;
use stylecoach_db::models::{AnalysisMetrics, SessionReport, SessionStatus};
use thiserror::Error;
use tracing::{info, warn};

use crate::ai::{AiReport, ConversationAi};
use crate::coordinator::format_transcript;
use crate::dao::base::DaoError;
use crate::dao::{AnalysisDao, ReportDao, SegmentDao, SessionDao};
use crate::events::{SessionBroadcaster, EVENT_NOTIFICATION};
use crate::scoring;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Dao(#[from] DaoError),
    #[error("session has no analyzable conversation data")]
    NoAnalyzableData,
}

pub struct ReportSynthesizer {
    sessions: Arc<SessionDao>,
    analyses: Arc<AnalysisDao>,
    segments: Arc<SegmentDao>,
    reports: Arc<ReportDao>,
    ai: Arc<ConversationAi>,
    broadcaster: Arc<dyn SessionBroadcaster>,
}

impl ReportSynthesizer {
    pub fn new(
        sessions: Arc<SessionDao>,
        analyses: Arc<AnalysisDao>,
        segments: Arc<SegmentDao>,
        reports: Arc<ReportDao>,
        ai: Arc<ConversationAi>,
        broadcaster: Arc<dyn SessionBroadcaster>,
    ) -> Self {
        Self {
            sessions,
            analyses,
            segments,
            reports,
            ai,
            broadcaster,
        }
    }

    /// Generates the session report, idempotently: an existing report is
    /// returned as-is. Drives the session processing -> analyzing ->
    /// completed; a failure leaves the session where it was so the task
    /// queue can retry.
    pub async fn synthesize(&self, session_id: ObjectId) -> Result<SessionReport, ReportError> {
        if let Some(existing) = self.reports.find_by_session(session_id).await? {
            // Crash between insert and the final transition is repaired
            // on retry.
            self.sessions
                .transition(
                    session_id,
                    &[SessionStatus::Processing, SessionStatus::Analyzing],
                    SessionStatus::Completed,
                )
                .await?;
            return Ok(existing);
        }

        let session = self.sessions.base.find_by_id(session_id).await?;
        self.sessions
            .transition(session_id, &[SessionStatus::Processing], SessionStatus::Analyzing)
            .await?;

        let analyses = self.analyses.find_by_session(session_id).await?;
        let segments = self.segments.find_by_session(session_id).await?;
        if analyses.is_empty() && segments.is_empty() {
            return Err(ReportError::NoAnalyzableData);
        }

        // The per-chunk metrics are cumulative; the last chunk's snapshot
        // stands in for the whole session.
        let metrics = analyses.last().map(|a| a.metrics.clone());
        let overall_score = metrics
            .as_ref()
            .map(scoring::overall_score)
            .unwrap_or(scoring::NEUTRAL_SCORE as i32);

        let conversation = format_transcript(&segments);
        let ai_report = if self.ai.is_available() {
            match self
                .ai
                .generate_report(&conversation, metrics.as_ref(), &session.customer_info)
                .await
            {
                Ok(report) => report,
                Err(e) => {
                    warn!(%session_id, %e, "AI report failed; using rule-based report");
                    rule_based_report(metrics.as_ref(), analyses.len())
                }
            }
        } else {
            rule_based_report(metrics.as_ref(), analyses.len())
        };

        let report = SessionReport {
            id: None,
            session_id,
            summary: ai_report.summary,
            overall_score,
            metrics,
            strengths: ai_report.strengths,
            improvements: ai_report.improvements,
            action_items: ai_report.action_items,
            feedback: ai_report.feedback,
            generated_at: DateTime::now(),
        };
        let stored = self.reports.insert(&report).await?;

        self.sessions
            .transition(
                session_id,
                &[SessionStatus::Analyzing, SessionStatus::Processing],
                SessionStatus::Completed,
            )
            .await?;

        info!(%session_id, overall_score, "Session report generated");

        self.broadcaster
            .broadcast(
                session_id,
                EVENT_NOTIFICATION,
                serde_json::json!({
                    "kind": "report_ready",
                    "sessionId": session_id.to_hex(),
                    "overallScore": overall_score,
                }),
            )
            .await;

        Ok(stored)
    }
}

/// Deterministic report assembled from the indicator snapshot alone.
/// Used whenever the AI collaborator is unconfigured or failing; a
/// session always ends with a report.
pub fn rule_based_report(metrics: Option<&AnalysisMetrics>, chunk_count: usize) -> AiReport {
    let mut strengths = Vec::new();
    let mut improvements = Vec::new();
    let mut action_items = Vec::new();

    if let Some(m) = metrics {
        if m.talk_ratio.score >= 80.0 {
            strengths.push("Kept a listening-first balance of speaking time".to_string());
        } else if m.talk_ratio.score < 70.0 {
            improvements.push(format!(
                "Speaking balance was off the 40:60 ideal (stylist {:.0}%)",
                m.talk_ratio.stylist_ratio
            ));
            action_items.push("Aim to let the customer speak about 60% of the time".to_string());
        }

        if m.question_quality.score >= 80.0 {
            strengths.push("Used open questions to draw the customer out".to_string());
        } else if m.question_quality.score < 70.0 {
            improvements.push(format!(
                "Few open questions ({} open vs {} closed)",
                m.question_quality.open_count, m.question_quality.closed_count
            ));
            action_items
                .push("Lead with 'how' and 'what' questions about hair routine".to_string());
        }

        if m.emotion.score >= 80.0 {
            strengths.push("Customer responses stayed positive throughout".to_string());
        } else if m.emotion.score < 70.0 {
            improvements.push(format!(
                "Positive customer reactions were limited ({:.0}%)",
                m.emotion.positive_ratio
            ));
        }

        if !m.concern_keywords.keywords.is_empty() {
            strengths.push(format!(
                "Surfaced customer concerns: {}",
                m.concern_keywords.keywords.join(", ")
            ));
        } else {
            improvements.push("No hair or scalp concerns were drawn out".to_string());
            action_items.push("Ask directly about dryness, damage or scalp issues".to_string());
        }

        if m.proposal_timing.score >= 80.0 {
            strengths.push("Proposed products promptly after hearing the concern".to_string());
        } else if m.proposal_timing.score < 70.0 {
            improvements
                .push("Product proposal came late or not at all after the concern".to_string());
            action_items
                .push("Connect a product suggestion within 3 minutes of a concern".to_string());
        }

        if m.conversion.is_converted {
            strengths.push("Closed a retail purchase".to_string());
        } else {
            action_items
                .push("Offer a take-home product matched to the discussed concern".to_string());
        }
    } else {
        improvements.push("No chunk analyses were produced for this session".to_string());
    }

    let summary = match metrics {
        Some(m) => format!(
            "Session analyzed across {chunk_count} conversation chunk(s). \
             Overall score {}. Speaking balance {:.0}:{:.0}, {} concern(s) surfaced.",
            scoring::overall_score(m),
            m.talk_ratio.stylist_ratio,
            m.talk_ratio.customer_ratio,
            m.concern_keywords.keywords.len()
        ),
        None => "Session ended without chunk analyses; only the raw transcript was captured."
            .to_string(),
    };

    AiReport {
        summary,
        strengths,
        improvements,
        action_items,
        feedback: Some(
            "Automatically generated summary. Review the transcript for context.".to_string(),
        ),
    }
}
