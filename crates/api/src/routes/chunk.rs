use axum::{
    Json,
    extract::{Multipart, Path, State},
};
use serde::Serialize;
use stylecoach_db::models::SessionStatus;
use tracing::info;

use crate::routes::session::parse_oid;
use crate::{error::ApiError, state::AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkIngestResponse {
    pub transcript_id: String,
    pub chunk_index: i32,
    pub audio_url: String,
    /// False when the diarization collaborator is unconfigured or the
    /// submission failed; the transcript is stored either way.
    pub diarization_triggered: bool,
}

/// `POST /api/session/{session_id}/chunk` — ingest one recording chunk:
/// multipart with an `audio` file plus `chunkIndex`, `transcript`,
/// `startTimeMs`, `endTimeMs` and optional `confidence` text fields.
pub async fn ingest(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ChunkIngestResponse>, ApiError> {
    let sid = parse_oid(&session_id, "session_id")?;

    let session = state.sessions.base.find_by_id(sid).await?;
    if session.status != SessionStatus::Recording {
        return Err(ApiError::InvalidState(format!(
            "Session is not recording (status: {})",
            session.status.as_str()
        )));
    }

    let mut audio: Option<Vec<u8>> = None;
    let mut chunk_index: Option<i32> = None;
    let mut transcript: Option<String> = None;
    let mut start_time_ms: Option<i64> = None;
    let mut end_time_ms: Option<i64> = None;
    let mut confidence: f64 = 1.0;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "audio" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read audio: {e}")))?;
                if bytes.len() as u64 > state.settings.app.max_chunk_bytes {
                    return Err(ApiError::Validation(format!(
                        "Audio chunk exceeds {} bytes",
                        state.settings.app.max_chunk_bytes
                    )));
                }
                audio = Some(bytes.to_vec());
            }
            "chunkIndex" => chunk_index = Some(parse_field(field, "chunkIndex").await?),
            "transcript" => {
                transcript = Some(field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read transcript: {e}"))
                })?);
            }
            "startTimeMs" => start_time_ms = Some(parse_field(field, "startTimeMs").await?),
            "endTimeMs" => end_time_ms = Some(parse_field(field, "endTimeMs").await?),
            "confidence" => confidence = parse_field(field, "confidence").await?,
            _ => {}
        }
    }

    let audio = audio.ok_or_else(|| ApiError::BadRequest("Missing 'audio' field".to_string()))?;
    let chunk_index =
        chunk_index.ok_or_else(|| ApiError::BadRequest("Missing 'chunkIndex' field".to_string()))?;
    let transcript =
        transcript.ok_or_else(|| ApiError::BadRequest("Missing 'transcript' field".to_string()))?;
    let start_time_ms = start_time_ms
        .ok_or_else(|| ApiError::BadRequest("Missing 'startTimeMs' field".to_string()))?;
    let end_time_ms = end_time_ms
        .ok_or_else(|| ApiError::BadRequest("Missing 'endTimeMs' field".to_string()))?;
    if chunk_index < 0 {
        return Err(ApiError::Validation("chunkIndex must be >= 0".to_string()));
    }
    if end_time_ms < start_time_ms {
        return Err(ApiError::Validation(
            "endTimeMs must be >= startTimeMs".to_string(),
        ));
    }

    let stored = state
        .media
        .store_chunk(session.salon_id, sid, chunk_index, &audio)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to store audio: {e}")))?;

    state
        .chunks
        .upsert_uploaded(sid, chunk_index, &stored.url, start_time_ms, end_time_ms)
        .await?;

    let row = state
        .transcripts
        .upsert(
            sid,
            chunk_index,
            &transcript,
            start_time_ms as f64 / 1000.0,
            end_time_ms as f64 / 1000.0,
            confidence,
            Some(&stored.url),
        )
        .await?;

    let callback_url = format!(
        "{}/api/diarization/callback",
        state.settings.app.public_base_url.trim_end_matches('/')
    );
    let diarization_triggered = state
        .diarization
        .start_job(sid, chunk_index, &stored.url, &callback_url)
        .await;

    info!(%sid, chunk_index, diarization_triggered, "Chunk ingested");

    Ok(Json(ChunkIngestResponse {
        transcript_id: row
            .id
            .map(|id| id.to_hex())
            .ok_or_else(|| ApiError::Internal("transcript without id".to_string()))?,
        chunk_index,
        audio_url: stored.url,
        diarization_triggered,
    }))
}

async fn parse_field<T: std::str::FromStr>(
    field: axum::extract::multipart::Field<'_>,
    name: &str,
) -> Result<T, ApiError> {
    let text = field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read '{name}': {e}")))?;
    text.trim()
        .parse::<T>()
        .map_err(|_| ApiError::BadRequest(format!("Invalid '{name}' value")))
}
