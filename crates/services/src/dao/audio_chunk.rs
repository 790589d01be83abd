use bson::{DateTime, doc, oid::ObjectId};
use mongodb::Database;
use stylecoach_db::models::{AudioChunk, ChunkStatus};

use super::base::{BaseDao, DaoResult};

pub struct ChunkDao {
    pub base: BaseDao<AudioChunk>,
}

impl ChunkDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, AudioChunk::COLLECTION),
        }
    }

    /// Records an uploaded chunk. Re-ingestion of the same chunk index
    /// refreshes the audio URL instead of duplicating the row.
    pub async fn upsert_uploaded(
        &self,
        session_id: ObjectId,
        chunk_index: i32,
        audio_url: &str,
        start_time_ms: i64,
        end_time_ms: i64,
    ) -> DaoResult<AudioChunk> {
        let now = DateTime::now();
        self.base
            .upsert_one(
                doc! { "session_id": session_id, "chunk_index": chunk_index },
                doc! {
                    "$set": {
                        "audio_url": audio_url,
                        "start_time_ms": start_time_ms,
                        "end_time_ms": end_time_ms,
                        "status": "uploading",
                        "error": null,
                    },
                    "$setOnInsert": {
                        "session_id": session_id,
                        "chunk_index": chunk_index,
                        "diarization_job_id": null,
                        "created_at": now,
                    },
                },
            )
            .await?;

        self.base
            .find_one(doc! { "session_id": session_id, "chunk_index": chunk_index })
            .await?
            .ok_or(super::base::DaoError::NotFound)
    }

    pub async fn find(
        &self,
        session_id: ObjectId,
        chunk_index: i32,
    ) -> DaoResult<Option<AudioChunk>> {
        self.base
            .find_one(doc! { "session_id": session_id, "chunk_index": chunk_index })
            .await
    }

    pub async fn set_diarizing(
        &self,
        session_id: ObjectId,
        chunk_index: i32,
        job_id: &str,
    ) -> DaoResult<bool> {
        self.base
            .update_one(
                doc! { "session_id": session_id, "chunk_index": chunk_index },
                doc! {
                    "$set": {
                        "status": "diarizing",
                        "diarization_job_id": job_id,
                    }
                },
            )
            .await
    }

    pub async fn set_completed(&self, session_id: ObjectId, chunk_index: i32) -> DaoResult<bool> {
        self.base
            .update_one(
                doc! { "session_id": session_id, "chunk_index": chunk_index },
                doc! { "$set": { "status": "completed" } },
            )
            .await
    }

    /// Chunk-level failure: recorded on the chunk, never escalated to the
    /// session. A completed chunk stays completed; a late poll timeout
    /// racing the webhook cannot demote it.
    pub async fn mark_error(
        &self,
        session_id: ObjectId,
        chunk_index: i32,
        error: &str,
    ) -> DaoResult<bool> {
        self.base
            .update_one(
                doc! {
                    "session_id": session_id,
                    "chunk_index": chunk_index,
                    "status": { "$ne": "completed" },
                },
                doc! { "$set": { "status": "error", "error": error } },
            )
            .await
    }

    pub async fn status(
        &self,
        session_id: ObjectId,
        chunk_index: i32,
    ) -> DaoResult<Option<ChunkStatus>> {
        Ok(self.find(session_id, chunk_index).await?.map(|c| c.status))
    }
}
