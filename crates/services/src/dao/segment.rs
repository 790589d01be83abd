use bson::{DateTime, doc, oid::ObjectId};
use mongodb::Database;
use stylecoach_db::models::SpeakerSegment;

use crate::merge::MergedSegment;

use super::base::{BaseDao, DaoResult};

pub struct SegmentDao {
    pub base: BaseDao<SpeakerSegment>,
}

impl SegmentDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, SpeakerSegment::COLLECTION),
        }
    }

    /// Writes merged segments idempotently, keyed by their time range.
    /// Re-delivery of the same diarization callback rewrites the same
    /// rows rather than duplicating them.
    pub async fn upsert_merged(
        &self,
        session_id: ObjectId,
        chunk_index: i32,
        segments: &[MergedSegment],
    ) -> DaoResult<usize> {
        let now = DateTime::now();
        for seg in segments {
            self.base
                .upsert_one(
                    doc! {
                        "session_id": session_id,
                        "chunk_index": chunk_index,
                        "start_time_ms": seg.start_time_ms,
                        "end_time_ms": seg.end_time_ms,
                    },
                    doc! {
                        "$set": {
                            "speaker": seg.speaker.as_str(),
                            "text": &seg.text,
                            "confidence": seg.confidence,
                        },
                        "$setOnInsert": {
                            "session_id": session_id,
                            "chunk_index": chunk_index,
                            "start_time_ms": seg.start_time_ms,
                            "end_time_ms": seg.end_time_ms,
                            "created_at": now,
                        },
                    },
                )
                .await?;
        }
        Ok(segments.len())
    }

    pub async fn find_by_chunk(
        &self,
        session_id: ObjectId,
        chunk_index: i32,
    ) -> DaoResult<Vec<SpeakerSegment>> {
        self.base
            .find_many(
                doc! { "session_id": session_id, "chunk_index": chunk_index },
                Some(doc! { "start_time_ms": 1 }),
            )
            .await
    }

    pub async fn find_by_session(&self, session_id: ObjectId) -> DaoResult<Vec<SpeakerSegment>> {
        self.base
            .find_many(
                doc! { "session_id": session_id },
                Some(doc! { "start_time_ms": 1 }),
            )
            .await
    }
}
