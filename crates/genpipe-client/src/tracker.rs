//! Submit/track/fetch lifecycle of a single remote job.

use std::time::Instant;

use genpipe_models::{JobHandle, JobStatus, QueueStatus, StageKind};
use reqwest::multipart::Form;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::{QueueClient, Submission};
use crate::config::StageConfig;
use crate::error::{GenerationError, GenerationResult};
use crate::metrics;
use crate::observer::{JobObserver, JobUpdate};

/// Drives one submission to a terminal state.
///
/// Every call to [`JobTracker::run`] creates a new remote job; nothing is
/// retried.
pub struct JobTracker<'a> {
    client: &'a QueueClient,
    stage: StageKind,
    config: &'a StageConfig,
    observer: &'a dyn JobObserver,
}

impl<'a> JobTracker<'a> {
    pub fn new(
        client: &'a QueueClient,
        stage: StageKind,
        config: &'a StageConfig,
        observer: &'a dyn JobObserver,
    ) -> Self {
        Self {
            client,
            stage,
            config,
            observer,
        }
    }

    /// Submit `form`, track the job and turn its result body into `T`.
    ///
    /// The whole lifecycle is bounded by the stage's `job_timeout`.
    pub async fn run<T, F>(&self, form: Form, extract: F) -> GenerationResult<T>
    where
        F: FnOnce(Value) -> GenerationResult<T>,
    {
        let started = Instant::now();
        let mut handle: Option<JobHandle> = None;

        metrics::record_job_submitted(self.stage);

        let lifecycle = self.drive(form, extract, &mut handle);
        let outcome = match tokio::time::timeout(self.config.job_timeout, lifecycle).await {
            Ok(outcome) => outcome,
            Err(_) => Err(GenerationError::Timeout {
                stage: self.stage,
                secs: self.config.job_timeout.as_secs(),
            }),
        };

        let elapsed = started.elapsed().as_secs_f64();
        match &outcome {
            Ok(_) => metrics::record_job_finished(self.stage, None, elapsed),
            Err(e) => {
                warn!(
                    stage = %self.stage,
                    job_id = ?handle.as_ref().map(|h| h.id.to_string()),
                    error = %e,
                    "Generation job failed"
                );
                if let Some(handle) = handle.as_mut() {
                    if handle.advance(JobStatus::Failed) {
                        self.notify(handle, Vec::new(), None);
                    }
                }
                metrics::record_job_finished(self.stage, Some(e.kind()), elapsed);
            }
        }

        outcome
    }

    async fn drive<T, F>(
        &self,
        form: Form,
        extract: F,
        slot: &mut Option<JobHandle>,
    ) -> GenerationResult<T>
    where
        F: FnOnce(Value) -> GenerationResult<T>,
    {
        let endpoint = &self.config.endpoint;

        let queued = match self.client.submit(endpoint, form).await? {
            Submission::Completed(body) => {
                debug!(stage = %self.stage, "Generation service answered synchronously");
                return extract(body);
            }
            Submission::Queued(queued) => queued,
        };

        let handle = slot.insert(JobHandle::new(queued.request_id.clone(), self.stage));
        info!(
            job_id = %handle.id,
            stage = %self.stage,
            endpoint = %endpoint,
            "Generation job queued"
        );
        self.notify(handle, Vec::new(), queued.queue_position);

        let status_url = self.client.status_url(endpoint, &queued);
        let mut reported_logs = 0usize;
        let mut queue_position = queued.queue_position;

        loop {
            let status = self.client.status(&status_url).await?;
            metrics::record_status_poll(self.stage);

            // Logs are cumulative; only forward lines beyond what was reported.
            let logs = status.logs.unwrap_or_default();
            let fresh: Vec<String> = logs
                .iter()
                .skip(reported_logs)
                .map(|entry| entry.message.clone())
                .collect();
            reported_logs = reported_logs.max(logs.len());

            match status.status {
                QueueStatus::InQueue | QueueStatus::InProgress => {
                    let changed = handle.advance(status.status.into());
                    let moved = status.queue_position != queue_position;
                    queue_position = status.queue_position;
                    if changed || moved || !fresh.is_empty() {
                        self.notify(handle, fresh, queue_position);
                    }
                }
                QueueStatus::Completed => {
                    if !fresh.is_empty() {
                        self.notify(handle, fresh, None);
                    }
                    break;
                }
                QueueStatus::Error => {
                    handle.advance(JobStatus::Failed);
                    self.notify(handle, fresh, None);
                    let message = status
                        .error
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| "the generation job ended with an error".to_string());
                    return Err(GenerationError::generation_failed(message));
                }
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }

        let body = self
            .client
            .result(&self.client.response_url(endpoint, &queued))
            .await?;
        let output = extract(body)?;

        handle.advance(JobStatus::Succeeded);
        info!(
            job_id = %handle.id,
            stage = %self.stage,
            elapsed_ms = handle.elapsed().num_milliseconds(),
            "Generation job completed"
        );
        self.notify(handle, Vec::new(), None);

        Ok(output)
    }

    fn notify(&self, handle: &JobHandle, logs: Vec<String>, queue_position: Option<u32>) {
        self.observer.on_update(&JobUpdate {
            job_id: handle.id.clone(),
            stage: handle.stage,
            status: handle.status,
            logs,
            queue_position,
        });
    }
}
