//! Remote job identity and lifecycle.
//!
//! A [`JobHandle`] tracks one submission to the remote queue from the moment
//! it is accepted until it reaches a terminal [`JobStatus`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier the remote queue assigned to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Pipeline stage a job belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Image synthesis
    Primary,
    /// Video synthesis from a primary result
    Video,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Primary => "primary",
            StageKind::Video => "video",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted by the queue, not yet running
    #[default]
    Submitted,
    /// Running on the remote service
    InProgress,
    /// Finished with a result
    Succeeded,
    /// Finished with an error
    Failed,
}

impl JobStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Submitted => "submitted",
            JobStatus::InProgress => "in_progress",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status as reported by the remote queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStatus {
    InQueue,
    InProgress,
    Completed,
    Error,
}

impl From<QueueStatus> for JobStatus {
    fn from(status: QueueStatus) -> Self {
        match status {
            QueueStatus::InQueue => JobStatus::Submitted,
            QueueStatus::InProgress => JobStatus::InProgress,
            QueueStatus::Completed => JobStatus::Succeeded,
            QueueStatus::Error => JobStatus::Failed,
        }
    }
}

/// One in-flight remote job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobHandle {
    pub id: JobId,
    pub stage: StageKind,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobHandle {
    /// Create a handle for a freshly accepted submission.
    pub fn new(id: impl Into<String>, stage: StageKind) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::from_string(id),
            stage,
            status: JobStatus::Submitted,
            submitted_at: now,
            updated_at: now,
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `status`. Terminal statuses are sticky; returns whether the
    /// status changed.
    pub fn advance(&mut self, status: JobStatus) -> bool {
        if self.status.is_terminal() || self.status == status {
            return false;
        }
        self.status = status;
        self.updated_at = Utc::now();
        true
    }

    /// Time since submission.
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.submitted_at
    }
}
