use bson::{doc, oid::ObjectId};
use mongodb::Database;
use stylecoach_db::models::SessionReport;

use super::base::{BaseDao, DaoError, DaoResult};

pub struct ReportDao {
    pub base: BaseDao<SessionReport>,
}

impl ReportDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, SessionReport::COLLECTION),
        }
    }

    /// Inserts the session's report. A concurrent duplicate insert
    /// resolves to the already-written report (unique index on
    /// session_id), keeping report generation idempotent.
    pub async fn insert(&self, report: &SessionReport) -> DaoResult<SessionReport> {
        match self.base.insert_one(report).await {
            Ok(id) => self.base.find_by_id(id).await,
            Err(DaoError::DuplicateKey(_)) => self
                .find_by_session(report.session_id)
                .await?
                .ok_or(DaoError::NotFound),
            Err(e) => Err(e),
        }
    }

    pub async fn find_by_session(&self, session_id: ObjectId) -> DaoResult<Option<SessionReport>> {
        self.base.find_one(doc! { "session_id": session_id }).await
    }
}
