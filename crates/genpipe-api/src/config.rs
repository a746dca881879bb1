//! API configuration.

use genpipe_models::EncodingConstraints;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size
    pub max_body_size: usize,
    /// Cap on pipelines running at once (`None` = unbounded)
    pub max_concurrent_pipelines: Option<usize>,
    /// Whether `/metrics` is served
    pub metrics_enabled: bool,
    /// Limits applied to every uploaded image
    pub constraints: EncodingConstraints,
    /// Environment (development/production)
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            max_body_size: 25 * 1024 * 1024, // two full-size camera photos
            max_concurrent_pipelines: None,
            metrics_enabled: true,
            constraints: EncodingConstraints::default(),
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = EncodingConstraints::default();

        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(25 * 1024 * 1024),
            max_concurrent_pipelines: std::env::var("MAX_CONCURRENT_PIPELINES")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            constraints: EncodingConstraints {
                max_width: env_or("ENCODE_MAX_WIDTH", defaults.max_width),
                max_height: env_or("ENCODE_MAX_HEIGHT", defaults.max_height),
                max_bytes: env_or("ENCODE_MAX_BYTES", defaults.max_bytes),
                quality: env_or("ENCODE_QUALITY", defaults.quality),
            },
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
