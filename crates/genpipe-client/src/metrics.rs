//! Job metrics.

use genpipe_models::StageKind;
use metrics::{counter, histogram};

pub mod names {
    pub const JOBS_SUBMITTED_TOTAL: &str = "genpipe_generation_jobs_submitted_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "genpipe_generation_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "genpipe_generation_jobs_failed_total";
    pub const JOB_DURATION_SECONDS: &str = "genpipe_generation_job_duration_seconds";
    pub const STATUS_POLLS_TOTAL: &str = "genpipe_generation_status_polls_total";
}

pub fn record_job_submitted(stage: StageKind) {
    counter!(names::JOBS_SUBMITTED_TOTAL, "stage" => stage.as_str()).increment(1);
}

pub fn record_status_poll(stage: StageKind) {
    counter!(names::STATUS_POLLS_TOTAL, "stage" => stage.as_str()).increment(1);
}

/// Record a finished job, successful or not.
pub fn record_job_finished(stage: StageKind, error_kind: Option<&'static str>, duration_secs: f64) {
    match error_kind {
        None => counter!(names::JOBS_COMPLETED_TOTAL, "stage" => stage.as_str()).increment(1),
        Some(kind) => counter!(
            names::JOBS_FAILED_TOTAL,
            "stage" => stage.as_str(),
            "error" => kind
        )
        .increment(1),
    }
    histogram!(names::JOB_DURATION_SECONDS, "stage" => stage.as_str()).record(duration_secs);
}
