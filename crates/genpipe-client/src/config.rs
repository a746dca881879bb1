//! Client and per-stage configuration.

use std::time::Duration;

/// Default queue API base URL.
pub const DEFAULT_BASE_URL: &str = "https://queue.fal.run";
/// Default portrait synthesis endpoint.
pub const DEFAULT_PORTRAIT_ENDPOINT: &str = "fal-ai/flux-pulid";
/// Default virtual try-on endpoint.
pub const DEFAULT_TRY_ON_ENDPOINT: &str = "fal-ai/kling/v1-5/kolors-virtual-try-on";
/// Default image-to-video endpoint.
pub const DEFAULT_VIDEO_ENDPOINT: &str = "fal-ai/luma-dream-machine/image-to-video";

fn env_secs(key: &str, default: u64) -> Duration {
    Duration::from_secs(
        std::env::var(key)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(default),
    )
}

/// Configuration for the HTTP client shared by all stages.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the queue API
    pub base_url: String,
    /// API key sent as `Authorization: Key <api_key>`
    pub api_key: Option<String>,
    /// Timeout for each individual HTTP request
    pub request_timeout: Duration,
    /// TCP connect timeout
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(120), // multipart uploads can be slow
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("FAL_QUEUE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            api_key: std::env::var("FAL_KEY").ok().filter(|k| !k.trim().is_empty()),
            request_timeout: env_secs("REQUEST_TIMEOUT_SECS", 120),
            connect_timeout: env_secs("CONNECT_TIMEOUT_SECS", 10),
        }
    }

    /// Point the client at another base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// Configuration for one remote stage.
#[derive(Debug, Clone)]
pub struct StageConfig {
    /// Endpoint path relative to the base URL
    pub endpoint: String,
    /// Upper bound on submit + tracking + result fetch
    pub job_timeout: Duration,
    /// Delay between status polls
    pub poll_interval: Duration,
}

impl StageConfig {
    pub fn new(endpoint: impl Into<String>, job_timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            job_timeout,
            poll_interval: Duration::from_secs(1),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn portrait() -> Self {
        Self::new(DEFAULT_PORTRAIT_ENDPOINT, Duration::from_secs(300))
    }

    pub fn try_on() -> Self {
        Self::new(DEFAULT_TRY_ON_ENDPOINT, Duration::from_secs(300))
    }

    pub fn video() -> Self {
        Self::new(DEFAULT_VIDEO_ENDPOINT, Duration::from_secs(600))
    }
}

/// Configuration for the whole orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub client: ClientConfig,
    pub portrait: StageConfig,
    pub try_on: StageConfig,
    pub video: StageConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            portrait: StageConfig::portrait(),
            try_on: StageConfig::try_on(),
            video: StageConfig::video(),
        }
    }
}

impl OrchestratorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let poll_interval = Duration::from_millis(
            std::env::var("POLL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
        );
        let primary_timeout = env_secs("PRIMARY_JOB_TIMEOUT_SECS", 300);

        Self {
            client: ClientConfig::from_env(),
            portrait: StageConfig::new(
                std::env::var("GENPIPE_PORTRAIT_ENDPOINT")
                    .unwrap_or_else(|_| DEFAULT_PORTRAIT_ENDPOINT.to_string()),
                primary_timeout,
            )
            .with_poll_interval(poll_interval),
            try_on: StageConfig::new(
                std::env::var("GENPIPE_TRY_ON_ENDPOINT")
                    .unwrap_or_else(|_| DEFAULT_TRY_ON_ENDPOINT.to_string()),
                primary_timeout,
            )
            .with_poll_interval(poll_interval),
            video: StageConfig::new(
                std::env::var("GENPIPE_VIDEO_ENDPOINT")
                    .unwrap_or_else(|_| DEFAULT_VIDEO_ENDPOINT.to_string()),
                env_secs("VIDEO_JOB_TIMEOUT_SECS", 600),
            )
            .with_poll_interval(poll_interval),
        }
    }

    /// Apply one poll interval to every stage.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.portrait.poll_interval = poll_interval;
        self.try_on.poll_interval = poll_interval;
        self.video.poll_interval = poll_interval;
        self
    }
}
