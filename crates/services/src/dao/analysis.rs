use bson::{DateTime, doc, oid::ObjectId};
use mongodb::Database;
use stylecoach_db::models::{AnalysisMetrics, ChunkAnalysis};

use super::base::{BaseDao, DaoError, DaoResult};

pub struct AnalysisDao {
    pub base: BaseDao<ChunkAnalysis>,
}

impl AnalysisDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, ChunkAnalysis::COLLECTION),
        }
    }

    /// One analysis per (session_id, chunk_index); re-analysis replaces
    /// the chunk's row in place.
    pub async fn upsert(
        &self,
        session_id: ObjectId,
        chunk_index: i32,
        overall_score: i32,
        metrics: &AnalysisMetrics,
        suggestions: &[String],
        highlights: &[String],
    ) -> DaoResult<ChunkAnalysis> {
        let metrics_bson = bson::to_bson(metrics)?;
        let now = DateTime::now();

        self.base
            .upsert_one(
                doc! { "session_id": session_id, "chunk_index": chunk_index },
                doc! {
                    "$set": {
                        "overall_score": overall_score,
                        "metrics": metrics_bson,
                        "suggestions": suggestions.to_vec(),
                        "highlights": highlights.to_vec(),
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
    ) -> DaoResult<Option<ChunkAnalysis>> {
        self.base
            .find_one(doc! { "session_id": session_id, "chunk_index": chunk_index })
            .await
    }

    pub async fn find_by_session(&self, session_id: ObjectId) -> DaoResult<Vec<ChunkAnalysis>> {
        self.base
            .find_many(
                doc! { "session_id": session_id },
                Some(doc! { "chunk_index": 1 }),
            )
            .await
    }
}
