//! Durable post-session pipeline.
//!
//! Ending a session enqueues a report task keyed by (session_id, stage)
//! and spawns a worker for it immediately; a background sweeper re-drives
//! anything pending, failed or abandoned mid-run, so a crash between
//! enqueue and completion loses nothing.

mod store;

pub use store::TaskStore;

use bson::{DateTime, oid::ObjectId};
use std::sync::Arc;
use std::time::Duration;
use stylecoach_config::PipelineSettings;
use stylecoach_db::models::{PipelineStage, PipelineTask};
use tracing::{error, info, warn};

use crate::dao::base::{DaoError, DaoResult};
use crate::reporting::{ReportError, ReportSynthesizer};
use stylecoach_db::models::SessionReport;

pub struct Pipeline {
    tasks: TaskStore,
    reports: Arc<ReportSynthesizer>,
    sweep_interval: Duration,
    stale_after: Duration,
}

impl Pipeline {
    pub fn new(
        tasks: TaskStore,
        reports: Arc<ReportSynthesizer>,
        settings: &PipelineSettings,
    ) -> Self {
        Self {
            tasks,
            reports,
            sweep_interval: Duration::from_secs(settings.sweep_interval_secs),
            stale_after: Duration::from_secs(settings.stale_after_secs),
        }
    }

    /// Enqueues (or re-arms, if previously failed) the session's report
    /// task. Callers follow up with `spawn` to run it right away.
    pub async fn enqueue_report(&self, session_id: ObjectId) -> DaoResult<PipelineTask> {
        self.tasks.enqueue(session_id, PipelineStage::Report).await
    }

    pub async fn report_task(&self, session_id: ObjectId) -> DaoResult<Option<PipelineTask>> {
        self.tasks.find(session_id, PipelineStage::Report).await
    }

    /// Runs the task on a detached worker. The claim inside `run` makes
    /// double-spawning harmless.
    pub fn spawn(self: &Arc<Self>, task: &PipelineTask) {
        let Some(task_id) = task.id else {
            warn!("Pipeline task without id; skipping spawn");
            return;
        };
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            pipeline.run(task_id).await;
        });
    }

    async fn run(&self, task_id: ObjectId) {
        let stale_before = stale_cutoff(self.stale_after);
        let claimed = match self.tasks.claim(task_id, stale_before).await {
            Ok(Some(task)) => task,
            // Held by another worker or already completed.
            Ok(None) => return,
            Err(e) => {
                error!(%task_id, %e, "Failed to claim pipeline task");
                return;
            }
        };

        info!(
            session_id = %claimed.session_id,
            stage = claimed.stage.as_str(),
            attempts = claimed.attempts,
            "Running pipeline task"
        );

        let result = match claimed.stage {
            PipelineStage::Report => self
                .reports
                .synthesize(claimed.session_id)
                .await
                .map(|_| ())
                .map_err(|e| e.to_string()),
        };

        let outcome = match result {
            Ok(()) => self.tasks.complete(task_id).await,
            Err(reason) => {
                warn!(session_id = %claimed.session_id, %reason, "Pipeline task failed");
                self.tasks.fail(task_id, &reason).await
            }
        };
        if let Err(e) = outcome {
            error!(%task_id, %e, "Failed to record pipeline task outcome");
        }
    }

    /// Synchronous report run for the explicit regeneration endpoint:
    /// enqueue (re-arming a failed task), claim, synthesize, record the
    /// outcome, and hand the report back. When another worker holds the
    /// claim the idempotent synthesize path still returns the report.
    pub async fn run_report(&self, session_id: ObjectId) -> Result<SessionReport, ReportError> {
        let task = self.tasks.enqueue(session_id, PipelineStage::Report).await?;
        let task_id = task.id.ok_or(DaoError::NotFound)?;

        match self
            .tasks
            .claim(task_id, stale_cutoff(self.stale_after))
            .await?
        {
            Some(_) => match self.reports.synthesize(session_id).await {
                Ok(report) => {
                    self.tasks.complete(task_id).await?;
                    Ok(report)
                }
                Err(e) => {
                    if let Err(store_err) = self.tasks.fail(task_id, &e.to_string()).await {
                        error!(%task_id, %store_err, "Failed to record pipeline task outcome");
                    }
                    Err(e)
                }
            },
            None => self.reports.synthesize(session_id).await,
        }
    }

    /// One sweep: spawn a worker for every resumable task. Called at
    /// startup and from the interval sweeper.
    pub async fn resume_stale(self: &Arc<Self>) -> DaoResult<usize> {
        let stale_before = stale_cutoff(self.stale_after);
        let tasks = self.tasks.resumable(stale_before).await?;
        let count = tasks.len();
        if count > 0 {
            info!(count, "Resuming pipeline tasks");
        }
        for task in &tasks {
            self.spawn(task);
        }
        Ok(count)
    }

    pub fn spawn_sweeper(self: &Arc<Self>) {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(pipeline.sweep_interval);
            // The immediate first tick duplicates the startup resume.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = pipeline.resume_stale().await {
                    error!(%e, "Pipeline sweep failed");
                }
            }
        });
    }
}

fn stale_cutoff(stale_after: Duration) -> DateTime {
    let now = DateTime::now().timestamp_millis();
    DateTime::from_millis(now - stale_after.as_millis() as i64)
}
