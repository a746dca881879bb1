//! Queue API request/response types.

use genpipe_models::QueueStatus;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Acknowledgement of a queued submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub request_id: String,
    #[serde(default)]
    pub status: Option<QueueStatus>,
    /// Absolute URL to poll; derived from the endpoint when absent
    #[serde(default)]
    pub status_url: Option<String>,
    /// Absolute URL of the result; derived from the endpoint when absent
    #[serde(default)]
    pub response_url: Option<String>,
    #[serde(default)]
    pub queue_position: Option<u32>,
}

/// Status poll response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: QueueStatus,
    /// Cumulative log lines since the job started
    #[serde(default)]
    pub logs: Option<Vec<LogEntry>>,
    #[serde(default)]
    pub queue_position: Option<u32>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub message: String,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Image description inside a result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImagePayload {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub width: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub height: Option<u32>,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Primary-stage result. Portrait synthesis answers with `images`, try-on
/// with a single `image`. Other fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrimaryOutput {
    #[serde(default)]
    pub images: Vec<ImagePayload>,
    #[serde(default)]
    pub image: Option<ImagePayload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoPayload {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub file_size: Option<u64>,
}

/// Video-stage result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoOutput {
    #[serde(default)]
    pub video: Option<VideoPayload>,
}

/// Optional metadata number; anything that is not a non-negative integer
/// reads as absent.
fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|v| v.as_u64()))
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_u64(deserializer)?.and_then(|v| u32::try_from(v).ok()))
}
