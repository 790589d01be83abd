use bson::{DateTime, doc, oid::ObjectId};
use mongodb::Database;
use stylecoach_db::models::{CustomerInfo, Session, SessionStatus};

use super::base::{BaseDao, DaoError, DaoResult, PaginatedResult, PaginationParams};

pub struct SessionDao {
    pub base: BaseDao<Session>,
}

impl SessionDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Session::COLLECTION),
        }
    }

    /// Starts a recording session. The partial unique index on
    /// (stylist_id, status=recording) rejects a concurrent second start
    /// with a duplicate-key error, which surfaces as `DuplicateKey`.
    pub async fn start(
        &self,
        salon_id: ObjectId,
        stylist_id: ObjectId,
        customer_info: CustomerInfo,
    ) -> DaoResult<Session> {
        let now = DateTime::now();
        let session = Session {
            id: None,
            salon_id,
            stylist_id,
            status: SessionStatus::Recording,
            customer_info,
            started_at: now,
            ended_at: None,
            total_duration_ms: None,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&session).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find_active_for_stylist(
        &self,
        stylist_id: ObjectId,
    ) -> DaoResult<Option<Session>> {
        self.base
            .find_one(doc! { "stylist_id": stylist_id, "status": "recording" })
            .await
    }

    /// Ends a recording session: guarded transition recording ->
    /// processing, stamping ended_at and total duration. Fails with
    /// `InvalidState` when the session is not recording.
    pub async fn end(&self, session_id: ObjectId) -> DaoResult<Session> {
        let session = self.base.find_by_id(session_id).await?;
        let now = DateTime::now();
        let total_duration_ms = now.timestamp_millis() - session.started_at.timestamp_millis();

        let updated = self
            .base
            .find_one_and_update(
                doc! { "_id": session_id, "status": "recording" },
                doc! {
                    "$set": {
                        "status": "processing",
                        "ended_at": now,
                        "total_duration_ms": total_duration_ms,
                    }
                },
            )
            .await?;

        updated.ok_or_else(|| {
            DaoError::InvalidState(format!(
                "Session is not recording (status: {})",
                session.status.as_str()
            ))
        })
    }

    /// Guarded status advance. Statuses only move forward; returns false
    /// when the session was no longer in any of `from` (already past it,
    /// or errored), which callers treat as a benign no-op.
    pub async fn transition(
        &self,
        session_id: ObjectId,
        from: &[SessionStatus],
        to: SessionStatus,
    ) -> DaoResult<bool> {
        let from: Vec<&str> = from.iter().map(|s| s.as_str()).collect();
        let updated = self
            .base
            .find_one_and_update(
                doc! { "_id": session_id, "status": { "$in": from } },
                doc! { "$set": { "status": to.as_str() } },
            )
            .await?;
        Ok(updated.is_some())
    }

    /// Marks a non-terminal session as errored.
    pub async fn mark_error(&self, session_id: ObjectId) -> DaoResult<bool> {
        let updated = self
            .base
            .find_one_and_update(
                doc! {
                    "_id": session_id,
                    "status": { "$nin": ["completed", "error"] },
                },
                doc! { "$set": { "status": "error" } },
            )
            .await?;
        Ok(updated.is_some())
    }

    pub async fn list_for_stylist(
        &self,
        stylist_id: ObjectId,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Session>> {
        self.base
            .find_paginated(
                doc! { "stylist_id": stylist_id },
                Some(doc! { "started_at": -1 }),
                params,
            )
            .await
    }
}
