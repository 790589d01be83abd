//! Speaker-diarization job orchestration.
//!
//! A chunk's audio is submitted to the external diarization service,
//! which labels time ranges by speaker identity. Results come back
//! either through the authenticated webhook or, failing that, a poll
//! loop (every `poll_interval`, up to `poll_timeout`). Both paths feed
//! the same idempotent resolve step, so duplicate delivery is harmless.
//! Diarization failure is chunk-local: the session keeps accepting
//! further chunks.

use bson::oid::ObjectId;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use stylecoach_config::{DiarizationSettings, RetrySettings};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::coordinator::ChunkAnalyzer;
use crate::dao::base::DaoResult;
use crate::dao::{ChunkDao, SegmentDao, TranscriptDao};
use crate::merge::{self, DiarizationSpan};
use crate::retry::{self, Transient};

#[derive(Debug, Error)]
pub enum DiarizationError {
    #[error("diarization service not configured")]
    NotConfigured,
    #[error("diarization request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("diarization API error {status}: {body}")]
    Api { status: u16, body: String },
}

impl Transient for DiarizationError {
    fn is_transient(&self) -> bool {
        match self {
            DiarizationError::Request(e) => retry::reqwest_transient(e),
            DiarizationError::Api { status, .. } => retry::status_transient(*status),
            DiarizationError::NotConfigured => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    job_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Diarization job snapshot as the collaborator reports it. Segment
/// times are in seconds.
#[derive(Debug, Deserialize)]
pub struct DiarizationJob {
    pub status: JobState,
    #[serde(default)]
    pub segments: Vec<WireSegment>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireSegment {
    pub speaker: String,
    #[serde(alias = "start_sec")]
    pub start: f64,
    #[serde(alias = "end_sec")]
    pub end: f64,
    pub confidence: Option<f64>,
}

impl WireSegment {
    pub fn to_span(&self) -> DiarizationSpan {
        DiarizationSpan {
            speaker_label: self.speaker.clone(),
            start_time_ms: (self.start * 1000.0).round() as i64,
            end_time_ms: (self.end * 1000.0).round() as i64,
            confidence: self.confidence.unwrap_or(0.9),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiarizationClient {
    client: Client,
    base_url: Option<String>,
    api_key: Option<String>,
    num_speakers: u32,
    retry: RetrySettings,
}

impl DiarizationClient {
    pub fn new(settings: &DiarizationSettings, retry: RetrySettings) -> Self {
        Self {
            client: Client::new(),
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
            num_speakers: settings.num_speakers,
            retry,
        }
    }

    pub fn is_available(&self) -> bool {
        self.base_url.is_some()
    }

    /// Submits a diarization job; the service later POSTs results to
    /// `callback_url` carrying the metadata back.
    pub async fn submit(
        &self,
        audio_url: &str,
        callback_url: &str,
        session_id: ObjectId,
        chunk_index: i32,
    ) -> Result<String, DiarizationError> {
        let base = self.base_url.as_ref().ok_or(DiarizationError::NotConfigured)?;
        let url = format!("{base}/diarize");

        let response: SubmitResponse = retry::with_backoff(&self.retry, "diarize_submit", || async {
            let mut req = self.client.post(&url).json(&serde_json::json!({
                "audio_url": audio_url,
                "callback_url": callback_url,
                "num_speakers": self.num_speakers,
                "metadata": {
                    "session_id": session_id.to_hex(),
                    "chunk_index": chunk_index,
                },
            }));
            if let Some(key) = &self.api_key {
                req = req.header("X-API-Key", key);
            }

            let resp = req.send().await?;
            if !resp.status().is_success() {
                let status = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                return Err(DiarizationError::Api { status, body });
            }
            Ok(resp.json::<SubmitResponse>().await?)
        })
        .await?;

        Ok(response.job_id)
    }

    pub async fn fetch_job(&self, job_id: &str) -> Result<DiarizationJob, DiarizationError> {
        let base = self.base_url.as_ref().ok_or(DiarizationError::NotConfigured)?;
        let url = format!("{base}/jobs/{job_id}");

        let mut req = self.client.get(&url);
        if let Some(key) = &self.api_key {
            req = req.header("X-API-Key", key);
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(DiarizationError::Api { status, body });
        }
        Ok(resp.json::<DiarizationJob>().await?)
    }
}

pub struct DiarizationOrchestrator {
    client: DiarizationClient,
    chunks: Arc<ChunkDao>,
    transcripts: Arc<TranscriptDao>,
    segments: Arc<SegmentDao>,
    analyzer: Arc<ChunkAnalyzer>,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl DiarizationOrchestrator {
    pub fn new(
        client: DiarizationClient,
        chunks: Arc<ChunkDao>,
        transcripts: Arc<TranscriptDao>,
        segments: Arc<SegmentDao>,
        analyzer: Arc<ChunkAnalyzer>,
        settings: &DiarizationSettings,
    ) -> Self {
        Self {
            client,
            chunks,
            transcripts,
            segments,
            analyzer,
            poll_interval: Duration::from_secs(settings.poll_interval_secs),
            poll_timeout: Duration::from_secs(settings.poll_timeout_secs),
        }
    }

    pub fn is_available(&self) -> bool {
        self.client.is_available()
    }

    /// Submits the chunk's audio for diarization and arms the polling
    /// fallback. Submission failure marks the chunk errored and returns
    /// false; it never fails the ingestion request.
    pub async fn start_job(
        self: &Arc<Self>,
        session_id: ObjectId,
        chunk_index: i32,
        audio_url: &str,
        callback_url: &str,
    ) -> bool {
        if !self.client.is_available() {
            return false;
        }

        match self
            .client
            .submit(audio_url, callback_url, session_id, chunk_index)
            .await
        {
            Ok(job_id) => {
                if let Err(e) = self
                    .chunks
                    .set_diarizing(session_id, chunk_index, &job_id)
                    .await
                {
                    error!(%session_id, chunk_index, %e, "Failed to record diarization job id");
                }
                Arc::clone(self).spawn_poll(job_id, session_id, chunk_index);
                true
            }
            Err(e) => {
                warn!(%session_id, chunk_index, %e, "Diarization submit failed");
                if let Err(db_err) = self
                    .chunks
                    .mark_error(session_id, chunk_index, &e.to_string())
                    .await
                {
                    error!(%session_id, chunk_index, %db_err, "Failed to mark chunk error");
                }
                false
            }
        }
    }

    /// Shared resolve path for webhook and poll results: merge the
    /// chunk's transcript against the speaker spans, upsert the merged
    /// segments (idempotent by time range), mark the chunk completed and
    /// kick off analysis. Returns the number of merged segments.
    pub async fn resolve_completed(
        &self,
        session_id: ObjectId,
        chunk_index: i32,
        spans: &[DiarizationSpan],
    ) -> DaoResult<usize> {
        let transcripts = self.transcripts.find_by_chunk(session_id, chunk_index).await?;
        if transcripts.is_empty() {
            info!(%session_id, chunk_index, "Diarization resolved before any transcript; nothing to merge");
            return Ok(0);
        }

        let merged = merge::merge_segments(&transcripts, spans);
        let count = self
            .segments
            .upsert_merged(session_id, chunk_index, &merged)
            .await?;
        self.chunks.set_completed(session_id, chunk_index).await?;

        info!(%session_id, chunk_index, count, "Merged speaker segments");

        // Merge-then-analyze is causally ordered within the chunk; the
        // analysis itself runs detached and its failures stay chunk-local.
        let analyzer = Arc::clone(&self.analyzer);
        tokio::spawn(async move {
            if let Err(e) = analyzer.analyze(session_id, chunk_index).await {
                warn!(%session_id, chunk_index, %e, "Chunk analysis failed");
            }
        });

        Ok(count)
    }

    /// Chunk-local failure: recorded on the chunk, invisible to the
    /// session.
    pub async fn resolve_failed(
        &self,
        session_id: ObjectId,
        chunk_index: i32,
        reason: &str,
    ) -> DaoResult<()> {
        warn!(%session_id, chunk_index, reason, "Diarization failed");
        self.chunks.mark_error(session_id, chunk_index, reason).await?;
        Ok(())
    }

    /// Polling fallback for when the webhook never arrives. Stops as
    /// soon as the chunk is resolved (the callback won the race), the
    /// job reaches a terminal state, or the ceiling expires.
    fn spawn_poll(self: Arc<Self>, job_id: String, session_id: ObjectId, chunk_index: i32) {
        tokio::spawn(async move {
            let deadline = Instant::now() + self.poll_timeout;

            loop {
                tokio::time::sleep(self.poll_interval).await;

                // The callback may have resolved the chunk during the
                // sleep; that always wins, including over the timeout.
                match self.chunks.status(session_id, chunk_index).await {
                    Ok(Some(status)) if status.is_resolved() => return,
                    Ok(_) => {}
                    Err(e) => warn!(%session_id, chunk_index, %e, "Poll status check failed"),
                }

                if Instant::now() >= deadline {
                    let _ = self
                        .resolve_failed(session_id, chunk_index, "diarization poll timeout")
                        .await;
                    return;
                }

                match self.client.fetch_job(&job_id).await {
                    Ok(job) => match job.status {
                        JobState::Completed => {
                            let spans: Vec<DiarizationSpan> =
                                job.segments.iter().map(WireSegment::to_span).collect();
                            if let Err(e) =
                                self.resolve_completed(session_id, chunk_index, &spans).await
                            {
                                error!(%session_id, chunk_index, %e, "Failed to resolve polled diarization");
                            }
                            return;
                        }
                        JobState::Failed => {
                            let reason = job.error.unwrap_or_else(|| "diarization job failed".into());
                            let _ = self.resolve_failed(session_id, chunk_index, &reason).await;
                            return;
                        }
                        JobState::Pending | JobState::Processing => {}
                    },
                    // Transient poll errors just wait for the next tick.
                    Err(e) => warn!(%session_id, chunk_index, %e, "Diarization poll failed"),
                }
            }
        });
    }
}
