//! Progress observation for remote jobs.

use genpipe_models::{JobId, JobStatus, StageKind};
use tracing::info;

/// A progress notification for one job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobUpdate {
    pub job_id: JobId,
    pub stage: StageKind,
    pub status: JobStatus,
    /// Log lines not included in any earlier update for this job
    pub logs: Vec<String>,
    pub queue_position: Option<u32>,
}

/// Receives progress updates while a job is tracked.
///
/// Called inline from the tracking loop; implementations should return
/// quickly.
pub trait JobObserver: Send + Sync {
    fn on_update(&self, update: &JobUpdate);
}

impl<F> JobObserver for F
where
    F: Fn(&JobUpdate) + Send + Sync,
{
    fn on_update(&self, update: &JobUpdate) {
        self(update)
    }
}

/// Observer that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl JobObserver for NoopObserver {
    fn on_update(&self, _update: &JobUpdate) {}
}

/// Observer that writes updates to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl JobObserver for TracingObserver {
    fn on_update(&self, update: &JobUpdate) {
        info!(
            job_id = %update.job_id,
            stage = %update.stage,
            status = %update.status,
            queue_position = ?update.queue_position,
            "Job status"
        );
        for line in &update.logs {
            info!(job_id = %update.job_id, stage = %update.stage, "{}", line);
        }
    }
}
