//! Realtime coaching alerts derived from a chunk's recomputed metrics.
//! Broadcast alongside the score update so the stylist's device can
//! nudge them mid-session.

use serde::Serialize;
use stylecoach_db::models::AnalysisMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    RiskWarning,
    TalkRatioAlert,
    EmotionNegativeAlert,
    QuestionShortageAlert,
    ConcernDetected,
    ProposalChance,
    ProposalMissedAlert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub data: serde_json::Value,
}

const RISK_SCORE_THRESHOLD: i32 = 50;
const TALK_RATIO_THRESHOLD: f64 = 60.0;
const POSITIVE_RATIO_THRESHOLD: f64 = 40.0;
const MIN_QUESTIONS_PER_CHUNK: u32 = 3;
const PROPOSAL_WINDOW_MS: i64 = 180_000;

pub fn derive_alerts(
    overall_score: i32,
    metrics: &AnalysisMetrics,
    chunk_index: i32,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if overall_score < RISK_SCORE_THRESHOLD {
        alerts.push(Alert {
            alert_type: AlertType::RiskWarning,
            severity: Severity::Critical,
            data: serde_json::json!({ "score": overall_score }),
        });
    }

    if metrics.talk_ratio.stylist_ratio > TALK_RATIO_THRESHOLD {
        alerts.push(Alert {
            alert_type: AlertType::TalkRatioAlert,
            severity: Severity::Warning,
            data: serde_json::json!({ "stylistRatio": metrics.talk_ratio.stylist_ratio }),
        });
    }

    if metrics.emotion.positive_ratio < POSITIVE_RATIO_THRESHOLD {
        alerts.push(Alert {
            alert_type: AlertType::EmotionNegativeAlert,
            severity: Severity::Warning,
            data: serde_json::json!({ "positiveRatio": metrics.emotion.positive_ratio }),
        });
    }

    // The opening chunk is exempt: the consultation may not have started.
    let question_count = metrics.question_quality.open_count + metrics.question_quality.closed_count;
    if chunk_index > 0 && question_count < MIN_QUESTIONS_PER_CHUNK {
        alerts.push(Alert {
            alert_type: AlertType::QuestionShortageAlert,
            severity: Severity::Info,
            data: serde_json::json!({ "questionCount": question_count }),
        });
    }

    let keywords = &metrics.concern_keywords.keywords;
    if !keywords.is_empty() {
        alerts.push(Alert {
            alert_type: AlertType::ConcernDetected,
            severity: Severity::Info,
            data: serde_json::json!({ "keywords": keywords }),
        });
        alerts.push(Alert {
            alert_type: AlertType::ProposalChance,
            severity: Severity::Info,
            data: serde_json::json!({ "concernKeywords": keywords }),
        });

        // Concern raised, but no proposal inside the 3-minute window.
        let missed = match metrics.proposal_timing.timing_ms {
            None => true,
            Some(t) => t > PROPOSAL_WINDOW_MS,
        };
        if missed {
            alerts.push(Alert {
                alert_type: AlertType::ProposalMissedAlert,
                severity: Severity::Warning,
                data: serde_json::json!({ "timingMs": metrics.proposal_timing.timing_ms }),
            });
        }
    }

    alerts
}
