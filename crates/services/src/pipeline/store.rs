use bson::{DateTime, doc, oid::ObjectId};
use mongodb::Database;
use stylecoach_db::models::{PipelineStage, PipelineTask};

use crate::dao::base::{BaseDao, DaoError, DaoResult};

/// Durable pipeline tasks, one row per (session_id, stage). Enqueue is
/// an upsert, claiming is a guarded CAS, so duplicate triggers and
/// concurrent workers collapse onto a single execution.
pub struct TaskStore {
    pub base: BaseDao<PipelineTask>,
}

impl TaskStore {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, PipelineTask::COLLECTION),
        }
    }

    /// Idempotent enqueue. A previously failed task is reset to pending
    /// so a manual retrigger gets a fresh run; pending/processing/
    /// completed rows are returned untouched.
    pub async fn enqueue(
        &self,
        session_id: ObjectId,
        stage: PipelineStage,
    ) -> DaoResult<PipelineTask> {
        let key = doc! { "session_id": session_id, "stage": stage.as_str() };
        let now = DateTime::now();

        self.base
            .upsert_one(
                key.clone(),
                doc! {
                    "$setOnInsert": {
                        "session_id": session_id,
                        "stage": stage.as_str(),
                        "status": "pending",
                        "attempts": 0,
                        "started_at": null,
                        "completed_at": null,
                        "error": null,
                        "created_at": now,
                    },
                },
            )
            .await?;

        self.base
            .update_one(
                doc! {
                    "session_id": session_id,
                    "stage": stage.as_str(),
                    "status": "failed",
                },
                doc! { "$set": { "status": "pending", "error": null } },
            )
            .await?;

        self.base.find_one(key).await?.ok_or(DaoError::NotFound)
    }

    /// Claims a task for execution. Matches pending and failed rows, and
    /// processing rows whose heartbeat predates `stale_before` (worker
    /// died mid-run). Returns None when another worker holds it or it is
    /// already completed.
    pub async fn claim(
        &self,
        task_id: ObjectId,
        stale_before: DateTime,
    ) -> DaoResult<Option<PipelineTask>> {
        self.base
            .find_one_and_update(
                doc! {
                    "_id": task_id,
                    "$or": [
                        { "status": { "$in": ["pending", "failed"] } },
                        { "status": "processing", "updated_at": { "$lt": stale_before } },
                    ],
                },
                doc! {
                    "$set": { "status": "processing", "started_at": DateTime::now() },
                    "$inc": { "attempts": 1 },
                },
            )
            .await
    }

    pub async fn complete(&self, task_id: ObjectId) -> DaoResult<()> {
        self.base
            .update_by_id(
                task_id,
                doc! {
                    "$set": {
                        "status": "completed",
                        "completed_at": DateTime::now(),
                        "error": null,
                    }
                },
            )
            .await?;
        Ok(())
    }

    pub async fn fail(&self, task_id: ObjectId, error: &str) -> DaoResult<()> {
        self.base
            .update_by_id(task_id, doc! { "$set": { "status": "failed", "error": error } })
            .await?;
        Ok(())
    }

    /// Tasks that should be (re)driven: pending/failed rows plus
    /// processing rows that have gone quiet.
    pub async fn resumable(&self, stale_before: DateTime) -> DaoResult<Vec<PipelineTask>> {
        self.base
            .find_many(
                doc! {
                    "$or": [
                        { "status": { "$in": ["pending", "failed"] } },
                        { "status": "processing", "updated_at": { "$lt": stale_before } },
                    ],
                },
                Some(doc! { "updated_at": 1 }),
            )
            .await
    }

    pub async fn find(
        &self,
        session_id: ObjectId,
        stage: PipelineStage,
    ) -> DaoResult<Option<PipelineTask>> {
        self.base
            .find_one(doc! { "session_id": session_id, "stage": stage.as_str() })
            .await
    }
}
