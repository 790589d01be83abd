use axum::{
    Json,
    extract::State,
    http::HeaderMap,
};
use serde::Deserialize;
use stylecoach_services::diarization::WireSegment;
use stylecoach_services::merge::DiarizationSpan;
use tracing::info;

use crate::routes::session::parse_oid;
use crate::{error::ApiError, state::AppState};

const CALLBACK_SECRET_HEADER: &str = "x-callback-secret";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiarizationCallback {
    #[serde(default)]
    pub job_id: Option<String>,
    pub status: CallbackStatus,
    pub metadata: CallbackMetadata,
    #[serde(default)]
    pub segments: Vec<WireSegment>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackStatus {
    Completed,
    Failed,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackMetadata {
    pub session_id: String,
    pub chunk_index: i32,
}

/// `POST /api/diarization/callback` — webhook from the diarization
/// service, authenticated by the shared X-Callback-Secret header.
/// Idempotent: a replayed completion re-upserts the same segments.
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<DiarizationCallback>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if let Some(expected) = &state.settings.diarization.callback_secret {
        let presented = headers
            .get(CALLBACK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok());
        if presented != Some(expected.as_str()) {
            return Err(ApiError::Unauthorized(
                "Invalid callback secret".to_string(),
            ));
        }
    }

    let sid = parse_oid(&payload.metadata.session_id, "sessionId")?;
    let chunk_index = payload.metadata.chunk_index;

    match payload.status {
        CallbackStatus::Completed => {
            let spans: Vec<DiarizationSpan> =
                payload.segments.iter().map(WireSegment::to_span).collect();
            let merged = state
                .diarization
                .resolve_completed(sid, chunk_index, &spans)
                .await?;
            info!(%sid, chunk_index, merged, "Diarization callback processed");
            Ok(Json(serde_json::json!({
                "ok": true,
                "mergedSegments": merged,
            })))
        }
        CallbackStatus::Failed => {
            let reason = payload
                .error
                .unwrap_or_else(|| "diarization job failed".to_string());
            state
                .diarization
                .resolve_failed(sid, chunk_index, &reason)
                .await?;
            // Acknowledged so the collaborator stops retrying.
            Ok(Json(serde_json::json!({ "ok": true })))
        }
    }
}
