//! Queue API HTTP client.

use std::sync::Arc;

use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{GenerationError, GenerationResult};
use crate::types::{StatusResponse, SubmitResponse};

/// Outcome of a submission.
#[derive(Debug, Clone)]
pub enum Submission {
    /// The service answered synchronously with the final result body.
    Completed(Value),
    /// The job was queued and must be tracked.
    Queued(SubmitResponse),
}

/// Client for the remote generation queue.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct QueueClient {
    http: Client,
    config: Arc<ClientConfig>,
}

impl QueueClient {
    /// Create a new queue client.
    pub fn new(config: ClientConfig) -> GenerationResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(GenerationError::Transport)?;

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> GenerationResult<Self> {
        Self::new(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether an API key is configured.
    pub fn has_credentials(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Absolute URL of an endpoint.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.trim_matches('/')
        )
    }

    /// URL to poll for a queued job.
    pub fn status_url(&self, endpoint: &str, queued: &SubmitResponse) -> String {
        queued.status_url.clone().unwrap_or_else(|| {
            format!(
                "{}/requests/{}/status",
                self.endpoint_url(endpoint),
                queued.request_id
            )
        })
    }

    /// URL of a queued job's result.
    pub fn response_url(&self, endpoint: &str, queued: &SubmitResponse) -> String {
        queued.response_url.clone().unwrap_or_else(|| {
            format!("{}/requests/{}", self.endpoint_url(endpoint), queued.request_id)
        })
    }

    /// Submit a multipart form to an endpoint.
    pub async fn submit(&self, endpoint: &str, form: Form) -> GenerationResult<Submission> {
        let url = self.endpoint_url(endpoint);
        debug!(url = %url, "Submitting generation job");

        let response = self.authorized(self.http.post(&url))?.multipart(form).send().await?;
        let body = read_json(response).await?;

        if body.get("request_id").and_then(Value::as_str).is_some() {
            let queued: SubmitResponse = serde_json::from_value(body).map_err(|e| {
                GenerationError::malformed(format!("invalid submit response: {}", e))
            })?;
            Ok(Submission::Queued(queued))
        } else {
            Ok(Submission::Completed(body))
        }
    }

    /// Poll a job's status, including its logs.
    pub async fn status(&self, status_url: &str) -> GenerationResult<StatusResponse> {
        let response = self
            .authorized(self.http.get(status_url))?
            .query(&[("logs", "1")])
            .send()
            .await?;
        let body = read_json(response).await?;

        serde_json::from_value(body)
            .map_err(|e| GenerationError::malformed(format!("invalid status response: {}", e)))
    }

    /// Fetch a completed job's result body.
    pub async fn result(&self, response_url: &str) -> GenerationResult<Value> {
        let response = self.authorized(self.http.get(response_url))?.send().await?;
        read_json(response).await
    }

    fn authorized(&self, builder: RequestBuilder) -> GenerationResult<RequestBuilder> {
        let key = self.config.api_key.as_deref().ok_or_else(|| {
            GenerationError::Configuration("FAL_KEY is not configured".to_string())
        })?;
        Ok(builder.header(reqwest::header::AUTHORIZATION, format!("Key {}", key)))
    }
}

async fn read_json(response: Response) -> GenerationResult<Value> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(GenerationError::from_response(status, &text));
    }

    serde_json::from_str(&text).map_err(|_| {
        GenerationError::malformed(format!(
            "expected a JSON body, got {} bytes of something else",
            text.len()
        ))
    })
}
