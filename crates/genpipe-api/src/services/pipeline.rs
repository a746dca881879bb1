//! End-to-end generation pipeline: encode uploads, then run the remote stages.

use std::sync::Arc;

use genpipe_client::{GenerationError, JobObserver, Orchestrator, TracingObserver};
use genpipe_media::{EncoderConfig, ImageEncoder, MediaError};
use genpipe_models::{
    EncodingConstraints, GenerationParams, GenerationRequest, MotionParams, ResultArtifact,
    SourceImage, VideoArtifact,
};
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, instrument};

/// Failure of a pipeline run. The `Display` output is meant for end users.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("{0}")]
    InvalidInput(String),

    #[error("The pipeline is shutting down")]
    ShuttingDown,
}

impl PipelineError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

/// Encoder plus orchestrator, shared by every request.
#[derive(Clone)]
pub struct Pipeline {
    encoder: ImageEncoder,
    orchestrator: Orchestrator,
    constraints: EncodingConstraints,
    permits: Option<Arc<Semaphore>>,
}

impl Pipeline {
    pub fn new(
        encoder: ImageEncoder,
        orchestrator: Orchestrator,
        constraints: EncodingConstraints,
    ) -> Self {
        Self {
            encoder,
            orchestrator,
            constraints,
            permits: None,
        }
    }

    /// Build from environment variables.
    pub fn from_env(constraints: EncodingConstraints) -> Result<Self, PipelineError> {
        Ok(Self::new(
            ImageEncoder::new(EncoderConfig::from_env()),
            Orchestrator::from_env()?,
            constraints,
        ))
    }

    /// Allow at most `limit` pipelines to run at once; further callers wait.
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.permits = Some(Arc::new(Semaphore::new(limit)));
        self
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn constraints(&self) -> &EncodingConstraints {
        &self.constraints
    }

    async fn permit(&self) -> Result<Option<OwnedSemaphorePermit>, PipelineError> {
        match &self.permits {
            Some(permits) => Arc::clone(permits)
                .acquire_owned()
                .await
                .map(Some)
                .map_err(|_| PipelineError::ShuttingDown),
            None => Ok(None),
        }
    }

    /// Encode `sources` in order and generate an image from them.
    ///
    /// `sources` must match the model's image parts: one reference photo for
    /// portraits, person then garment for try-on.
    #[instrument(skip_all, fields(model = %params.model(), sources = sources.len()))]
    pub async fn run_image_pipeline(
        &self,
        sources: Vec<SourceImage>,
        params: GenerationParams,
        observer: &dyn JobObserver,
    ) -> Result<ResultArtifact, PipelineError> {
        params.validate().map_err(PipelineError::InvalidInput)?;

        let parts = params.model().asset_parts();
        if sources.len() != parts.len() {
            return Err(PipelineError::invalid_input(format!(
                "Expected {} image(s) ({}), got {}",
                parts.len(),
                parts.join(", "),
                sources.len()
            )));
        }

        let _permit = self.permit().await?;

        let mut assets = Vec::with_capacity(sources.len());
        for (part, source) in parts.iter().zip(sources) {
            let asset = self.encoder.encode(source, &self.constraints).await?;
            debug!(
                part = %part,
                bytes = asset.len(),
                width = asset.width,
                height = asset.height,
                "Encoded upload"
            );
            assets.push(asset);
        }

        let request = GenerationRequest::new(assets, params);
        let artifact = self.orchestrator.submit_primary(request, observer).await?;
        info!(url = %artifact.url, "Image generated");

        Ok(artifact)
    }

    /// Animate a generated image.
    #[instrument(skip_all, fields(source = %artifact.url))]
    pub async fn run_video_pipeline(
        &self,
        artifact: &ResultArtifact,
        motion: MotionParams,
    ) -> Result<VideoArtifact, PipelineError> {
        let _permit = self.permit().await?;

        let video = self
            .orchestrator
            .submit_secondary_with(artifact, &motion, &TracingObserver)
            .await?;
        info!(url = %video.url, "Video generated");

        Ok(video)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genpipe_client::{ClientConfig, NoopObserver, OrchestratorConfig};
    use genpipe_models::{PortraitParams, TryOnParams};

    fn pipeline() -> Pipeline {
        let orchestrator = Orchestrator::new(OrchestratorConfig {
            client: ClientConfig::default()
                .with_base_url("http://127.0.0.1:1")
                .with_api_key("k"),
            ..OrchestratorConfig::default()
        })
        .unwrap();
        Pipeline::new(
            ImageEncoder::default(),
            orchestrator,
            EncodingConstraints::default(),
        )
    }

    #[tokio::test]
    async fn test_source_count_must_match_model() {
        let err = pipeline()
            .run_image_pipeline(
                vec![SourceImage::new(vec![1, 2, 3], "image/png")],
                GenerationParams::TryOn(TryOnParams::default()),
                &NoopObserver,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_missing_prompt_rejected_before_encoding() {
        let err = pipeline()
            .run_image_pipeline(
                vec![SourceImage::new(b"not an image".to_vec(), "image/png")],
                GenerationParams::Portrait(PortraitParams::new("  ")),
                &NoopObserver,
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Please enter a vision description");
    }

    #[tokio::test]
    async fn test_undecodable_upload_is_media_error() {
        let err = pipeline()
            .run_image_pipeline(
                vec![SourceImage::new(b"not an image".to_vec(), "image/png")],
                GenerationParams::Portrait(PortraitParams::new("a lighthouse")),
                &NoopObserver,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Media(MediaError::Decode(_))), "{:?}", err);
    }

    #[tokio::test]
    async fn test_concurrency_limit_permits_are_released() {
        let pipeline = pipeline().with_concurrency_limit(1);
        for _ in 0..3 {
            let permit = pipeline.permit().await.unwrap();
            assert!(permit.is_some());
        }
    }
}
