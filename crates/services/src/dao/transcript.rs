use bson::{DateTime, doc, oid::ObjectId};
use mongodb::Database;
use stylecoach_db::models::TranscriptSegment;

use super::base::{BaseDao, DaoError, DaoResult};

pub struct TranscriptDao {
    pub base: BaseDao<TranscriptSegment>,
}

impl TranscriptDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, TranscriptSegment::COLLECTION),
        }
    }

    /// Upserts the chunk's transcript keyed by (session_id, chunk_index):
    /// at most one transcript row per chunk in the ingestion path.
    pub async fn upsert(
        &self,
        session_id: ObjectId,
        chunk_index: i32,
        text: &str,
        start_time_sec: f64,
        end_time_sec: f64,
        confidence: f64,
        audio_url: Option<&str>,
    ) -> DaoResult<TranscriptSegment> {
        let now = DateTime::now();
        self.base
            .upsert_one(
                doc! { "session_id": session_id, "chunk_index": chunk_index },
                doc! {
                    "$set": {
                        "text": text,
                        "start_time_sec": start_time_sec,
                        "end_time_sec": end_time_sec,
                        "confidence": confidence,
                        "audio_url": audio_url,
                    },
                    "$setOnInsert": {
                        "session_id": session_id,
                        "chunk_index": chunk_index,
                        "created_at": now,
                    },
                },
            )
            .await?;

        self.base
            .find_one(doc! { "session_id": session_id, "chunk_index": chunk_index })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn find_by_chunk(
        &self,
        session_id: ObjectId,
        chunk_index: i32,
    ) -> DaoResult<Vec<TranscriptSegment>> {
        self.base
            .find_many(
                doc! { "session_id": session_id, "chunk_index": chunk_index },
                Some(doc! { "start_time_sec": 1 }),
            )
            .await
    }
}
