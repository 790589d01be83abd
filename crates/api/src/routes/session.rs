use axum::{
    Json,
    extract::{Path, Query, State},
};
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use stylecoach_db::models::{CustomerInfo, Session};
use stylecoach_services::dao::base::{DaoError, PaginationParams};
use tracing::info;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub salon_id: String,
    pub stylist_id: String,
    #[serde(default)]
    pub customer_info: CustomerInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: String,
    pub salon_id: String,
    pub stylist_id: String,
    pub status: String,
    pub customer_info: CustomerInfo,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub total_duration_ms: Option<i64>,
    /// Realtime topic for this session's events.
    pub channel: String,
}

fn to_response(s: Session) -> Result<SessionResponse, ApiError> {
    let id = s
        .id
        .ok_or_else(|| ApiError::Internal("session without id".to_string()))?;
    Ok(SessionResponse {
        session_id: id.to_hex(),
        salon_id: s.salon_id.to_hex(),
        stylist_id: s.stylist_id.to_hex(),
        status: s.status.as_str().to_string(),
        customer_info: s.customer_info,
        started_at: s.started_at.try_to_rfc3339_string().unwrap_or_default(),
        ended_at: s
            .ended_at
            .map(|t| t.try_to_rfc3339_string().unwrap_or_default()),
        total_duration_ms: s.total_duration_ms,
        channel: format!("session:{}", id.to_hex()),
    })
}

pub fn parse_oid(value: &str, name: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(value).map_err(|_| ApiError::BadRequest(format!("Invalid {name}")))
}

/// `POST /api/session` — start a recording session. A stylist can have
/// at most one active session; a concurrent second start loses the
/// insert race and gets a conflict.
pub async fn start(
    State(state): State<AppState>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let salon_id = parse_oid(&payload.salon_id, "salonId")?;
    let stylist_id = parse_oid(&payload.stylist_id, "stylistId")?;

    let session = state
        .sessions
        .start(salon_id, stylist_id, payload.customer_info)
        .await
        .map_err(|e| match e {
            DaoError::DuplicateKey(_) => {
                ApiError::Conflict("Stylist already has an active session".to_string())
            }
            other => other.into(),
        })?;

    info!(session_id = ?session.id, %stylist_id, "Session started");
    Ok(Json(to_response(session)?))
}

/// `POST /api/session/{session_id}/end` — stop recording and enqueue
/// report generation.
pub async fn end(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let sid = parse_oid(&session_id, "session_id")?;

    let session = state.sessions.end(sid).await?;

    // Durable handoff: the task row survives a crash between here and
    // report completion, and the sweeper re-drives it.
    let task = state.pipeline.enqueue_report(sid).await?;
    state.pipeline.spawn(&task);

    info!(%sid, "Session ended; report task enqueued");
    Ok(Json(to_response(session)?))
}

pub async fn get(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let sid = parse_oid(&session_id, "session_id")?;
    let session = state.sessions.base.find_by_id(sid).await?;
    Ok(Json(to_response(session)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub stylist_id: String,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let stylist_id = parse_oid(&params.stylist_id, "stylistId")?;
    let defaults = PaginationParams::default();
    let pagination = PaginationParams {
        page: params.page.unwrap_or(defaults.page),
        per_page: params.per_page.unwrap_or(defaults.per_page),
    };
    let result = state
        .sessions
        .list_for_stylist(stylist_id, &pagination)
        .await?;

    let items: Vec<SessionResponse> = result
        .items
        .into_iter()
        .map(to_response)
        .collect::<Result<_, _>>()?;

    Ok(Json(serde_json::json!({
        "items": items,
        "total": result.total,
        "page": result.page,
        "perPage": result.per_page,
        "totalPages": result.total_pages,
    })))
}
