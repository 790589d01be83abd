use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use stylecoach_db::models::{AnalysisMetrics, ChunkAnalysis};
use stylecoach_services::coordinator::AnalyzeOutcome;

use crate::routes::session::parse_oid;
use crate::{error::ApiError, state::AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub session_id: String,
    pub chunk_index: i32,
    pub overall_score: i32,
    pub metrics: AnalysisMetrics,
    pub suggestions: Vec<String>,
    pub highlights: Vec<String>,
}

fn to_response(a: ChunkAnalysis) -> AnalysisResponse {
    AnalysisResponse {
        session_id: a.session_id.to_hex(),
        chunk_index: a.chunk_index,
        overall_score: a.overall_score,
        metrics: a.metrics,
        suggestions: a.suggestions,
        highlights: a.highlights,
    }
}

/// `POST /api/session/{session_id}/chunk/{chunk_index}/analyze` —
/// (re)run the analysis for one chunk. Normally analysis runs
/// automatically after merge; this is the manual retrigger.
pub async fn analyze(
    State(state): State<AppState>,
    Path((session_id, chunk_index)): Path<(String, i32)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let sid = parse_oid(&session_id, "session_id")?;

    match state.analyzer.analyze(sid, chunk_index).await? {
        AnalyzeOutcome::NothingToAnalyze => Ok(Json(serde_json::json!({
            "analyzed": false,
            "reason": "no merged segments for this chunk",
        }))),
        AnalyzeOutcome::Analyzed(analysis) => Ok(Json(serde_json::json!({
            "analyzed": true,
            "analysis": to_response(analysis),
        }))),
    }
}

/// `GET /api/session/{session_id}/chunk/{chunk_index}/analysis`
pub async fn get(
    State(state): State<AppState>,
    Path((session_id, chunk_index)): Path<(String, i32)>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let sid = parse_oid(&session_id, "session_id")?;
    let analysis = state
        .analyses
        .find_by_chunk(sid, chunk_index)
        .await?
        .ok_or_else(|| ApiError::NotFound("No analysis for this chunk".to_string()))?;
    Ok(Json(to_response(analysis)))
}

/// `GET /api/session/{session_id}/analysis` — all chunk analyses in
/// chunk order.
pub async fn list(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let sid = parse_oid(&session_id, "session_id")?;
    let items: Vec<AnalysisResponse> = state
        .analyses
        .find_by_session(sid)
        .await?
        .into_iter()
        .map(to_response)
        .collect();
    Ok(Json(serde_json::json!({ "items": items })))
}
