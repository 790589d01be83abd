use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use stylecoach_db::models::{AnalysisMetrics, SessionReport};

use crate::routes::session::parse_oid;
use crate::{error::ApiError, state::AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub session_id: String,
    pub summary: String,
    pub overall_score: i32,
    pub metrics: Option<AnalysisMetrics>,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub action_items: Vec<String>,
    pub feedback: Option<String>,
    pub generated_at: String,
}

fn to_response(r: SessionReport) -> ReportResponse {
    ReportResponse {
        session_id: r.session_id.to_hex(),
        summary: r.summary,
        overall_score: r.overall_score,
        metrics: r.metrics,
        strengths: r.strengths,
        improvements: r.improvements,
        action_items: r.action_items,
        feedback: r.feedback,
        generated_at: r.generated_at.try_to_rfc3339_string().unwrap_or_default(),
    }
}

/// `POST /api/session/{session_id}/report` — synchronous (re)generation.
/// Idempotent: an existing report is returned without regenerating.
pub async fn generate(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ReportResponse>, ApiError> {
    let sid = parse_oid(&session_id, "session_id")?;

    // Existence check first so an unknown id is a 404, not invalid_state.
    state.sessions.base.find_by_id(sid).await?;

    let report = state.pipeline.run_report(sid).await?;
    Ok(Json(to_response(report)))
}

/// `GET /api/session/{session_id}/report`
pub async fn get(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ReportResponse>, ApiError> {
    let sid = parse_oid(&session_id, "session_id")?;
    let report = state
        .reports
        .find_by_session(sid)
        .await?
        .ok_or_else(|| ApiError::NotFound("Report not generated yet".to_string()))?;
    Ok(Json(to_response(report)))
}
