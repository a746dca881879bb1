//! Application state.

use std::sync::Arc;

use genpipe_media::MediaError;

use crate::config::ApiConfig;
use crate::services::{Pipeline, PipelineError};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    /// Create new application state.
    ///
    /// Fails when the configured encoding constraints are unusable, so a bad
    /// `ENCODE_*` value stops startup instead of failing every upload.
    pub fn new(config: ApiConfig) -> Result<Self, PipelineError> {
        config
            .constraints
            .validate()
            .map_err(MediaError::InvalidConstraints)?;

        let pipeline = Pipeline::from_env(config.constraints)?;
        Ok(Self::with_pipeline(config, pipeline))
    }

    /// Create state around an existing pipeline.
    pub fn with_pipeline(config: ApiConfig, pipeline: Pipeline) -> Self {
        let pipeline = match config.max_concurrent_pipelines {
            Some(limit) => pipeline.with_concurrency_limit(limit),
            None => pipeline,
        };

        Self {
            config,
            pipeline: Arc::new(pipeline),
        }
    }
}
