//! Orchestrator error types.

use genpipe_models::StageKind;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

pub type GenerationResult<T> = Result<T, GenerationError>;

/// Longest service-supplied message carried into an error.
const MAX_MESSAGE_LEN: usize = 500;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Could not reach the generation service: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed response from generation service: {0}")]
    MalformedResponse(String),

    #[error("Generation failed: {message}")]
    GenerationFailed { message: String },

    #[error("The {stage} job did not finish within {secs} seconds")]
    Timeout { stage: StageKind, secs: u64 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl GenerationError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    pub fn generation_failed(message: impl Into<String>) -> Self {
        Self::GenerationFailed {
            message: message.into(),
        }
    }

    /// Build an error from a non-2xx response, preferring the message the
    /// service put in its body.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = service_message(body)
            .unwrap_or_else(|| format!("generation service returned status {}", status.as_u16()));
        Self::GenerationFailed { message }
    }

    /// Short label used in metrics and error codes.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::Transport(_) => "transport",
            GenerationError::MalformedResponse(_) => "malformed_response",
            GenerationError::GenerationFailed { .. } => "generation_failed",
            GenerationError::Timeout { .. } => "timeout",
            GenerationError::InvalidRequest(_) => "invalid_request",
            GenerationError::Configuration(_) => "configuration",
        }
    }

    /// Whether a fresh manual attempt might succeed. Nothing is retried
    /// automatically: every resubmission is a new, billed remote job.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GenerationError::Transport(_) | GenerationError::Timeout { .. }
        )
    }
}

/// Pull a human-readable message out of an error body.
///
/// Understands `{"detail": "..."}`, validation lists
/// `{"detail": [{"msg": "..."}]}`, `{"error": "..."}` and `{"message": "..."}`;
/// falls back to the raw text.
pub(crate) fn service_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let message = match serde_json::from_str::<Value>(body) {
        Ok(json) => json_message(&json)?,
        Err(_) => body.to_string(),
    };

    Some(truncate(message))
}

fn json_message(json: &Value) -> Option<String> {
    for key in ["detail", "error", "message"] {
        match json.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
            Some(Value::Array(items)) => {
                let msgs: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str))
                    .collect();
                if !msgs.is_empty() {
                    return Some(msgs.join("; "));
                }
            }
            Some(Value::Object(inner)) => {
                if let Some(Value::String(s)) = inner.get("message") {
                    return Some(s.clone());
                }
            }
            _ => {}
        }
    }
    None
}

fn truncate(mut message: String) -> String {
    if message.len() > MAX_MESSAGE_LEN {
        let mut cut = MAX_MESSAGE_LEN;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
        message.push('…');
    }
    message
}
