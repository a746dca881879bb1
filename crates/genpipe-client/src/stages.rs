//! Primary and video stages, and the orchestrator that chains them.

use genpipe_models::{
    GenerationRequest, MotionParams, PrimaryModel, ResultArtifact, StageKind, VideoArtifact,
};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::instrument;

use crate::client::QueueClient;
use crate::config::{OrchestratorConfig, StageConfig};
use crate::error::{GenerationError, GenerationResult};
use crate::observer::{JobObserver, NoopObserver};
use crate::tracker::JobTracker;
use crate::types::{PrimaryOutput, VideoOutput};

/// Image synthesis from encoded reference images.
#[derive(Clone)]
pub struct PrimaryStage {
    client: QueueClient,
    portrait: StageConfig,
    try_on: StageConfig,
}

impl PrimaryStage {
    pub fn new(client: QueueClient, portrait: StageConfig, try_on: StageConfig) -> Self {
        Self {
            client,
            portrait,
            try_on,
        }
    }

    /// Stage configuration used for a model.
    pub fn config_for(&self, model: PrimaryModel) -> &StageConfig {
        match model {
            PrimaryModel::Portrait => &self.portrait,
            PrimaryModel::TryOn => &self.try_on,
        }
    }

    #[instrument(
        skip_all,
        fields(model = %request.model(), payload_bytes = request.payload_bytes())
    )]
    pub async fn submit(
        &self,
        request: GenerationRequest,
        observer: &dyn JobObserver,
    ) -> GenerationResult<ResultArtifact> {
        request.validate().map_err(GenerationError::InvalidRequest)?;

        let model = request.model();
        let form = build_primary_form(request)?;

        JobTracker::new(&self.client, StageKind::Primary, self.config_for(model), observer)
            .run(form, |body| extract_image(model, body))
            .await
    }
}

/// Build the multipart form for a primary submission.
///
/// One part per asset, named after the model's image parts, followed by one
/// text part per scalar option.
pub fn build_primary_form(request: GenerationRequest) -> GenerationResult<Form> {
    let model = request.model();
    let GenerationRequest { assets, params } = request;

    let mut form = Form::new();
    for (name, asset) in model.asset_parts().iter().zip(assets) {
        let part = Part::bytes(asset.bytes)
            .file_name(format!("{}.jpg", name))
            .mime_str(&asset.media_type)
            .map_err(|e| GenerationError::InvalidRequest(format!("invalid media type: {}", e)))?;
        form = form.part(*name, part);
    }

    for (name, value) in params.form_fields() {
        form = form.text(name, value);
    }

    Ok(form)
}

/// Pull the generated image out of a primary result body.
pub fn extract_image(model: PrimaryModel, body: Value) -> GenerationResult<ResultArtifact> {
    let output: PrimaryOutput = serde_json::from_value(body)
        .map_err(|e| GenerationError::malformed(format!("unexpected result shape: {}", e)))?;

    let payload = match model {
        PrimaryModel::Portrait => output.images.into_iter().next(),
        PrimaryModel::TryOn => output.image,
    }
    .ok_or_else(|| GenerationError::malformed("result contains no image"))?;

    let url = payload
        .url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| GenerationError::malformed("result image has no URL"))?;

    Ok(ResultArtifact {
        url,
        width: payload.width,
        height: payload.height,
        media_type: payload.content_type,
    })
}

/// Video synthesis from a primary result.
#[derive(Clone)]
pub struct VideoStage {
    client: QueueClient,
    config: StageConfig,
}

impl VideoStage {
    pub fn new(client: QueueClient, config: StageConfig) -> Self {
        Self { client, config }
    }

    #[instrument(skip_all, fields(source = %artifact.url))]
    pub async fn submit(
        &self,
        artifact: &ResultArtifact,
        motion: &MotionParams,
        observer: &dyn JobObserver,
    ) -> GenerationResult<VideoArtifact> {
        motion.validate().map_err(GenerationError::InvalidRequest)?;

        let mut form = Form::new().text("image_url", artifact.url.clone());
        for (name, value) in motion.form_fields() {
            form = form.text(name, value);
        }

        JobTracker::new(&self.client, StageKind::Video, &self.config, observer)
            .run(form, extract_video)
            .await
    }
}

/// Pull the generated video out of a video result body.
pub fn extract_video(body: Value) -> GenerationResult<VideoArtifact> {
    let output: VideoOutput = serde_json::from_value(body)
        .map_err(|e| GenerationError::malformed(format!("unexpected result shape: {}", e)))?;

    let video = output
        .video
        .ok_or_else(|| GenerationError::malformed("result contains no video"))?;
    let url = video
        .url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| GenerationError::malformed("result video has no URL"))?;

    Ok(VideoArtifact {
        url,
        media_type: video.content_type,
        file_size: video.file_size,
    })
}

/// Runs the primary stage and, on request, the video stage.
///
/// The stages are independent: a video failure leaves the primary
/// [`ResultArtifact`] untouched and the video stage can be invoked again.
#[derive(Clone)]
pub struct Orchestrator {
    client: QueueClient,
    primary: PrimaryStage,
    video: VideoStage,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> GenerationResult<Self> {
        let client = QueueClient::new(config.client)?;
        Ok(Self {
            primary: PrimaryStage::new(client.clone(), config.portrait, config.try_on),
            video: VideoStage::new(client.clone(), config.video),
            client,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> GenerationResult<Self> {
        Self::new(OrchestratorConfig::from_env())
    }

    pub fn client(&self) -> &QueueClient {
        &self.client
    }

    /// Submit a primary generation and wait for its result.
    pub async fn submit_primary(
        &self,
        request: GenerationRequest,
        observer: &dyn JobObserver,
    ) -> GenerationResult<ResultArtifact> {
        self.primary.submit(request, observer).await
    }

    /// Animate a primary result with default motion parameters.
    pub async fn submit_secondary(
        &self,
        artifact: &ResultArtifact,
        motion_prompt: &str,
    ) -> GenerationResult<VideoArtifact> {
        self.submit_secondary_with(artifact, &MotionParams::new(motion_prompt), &NoopObserver)
            .await
    }

    pub async fn submit_secondary_with(
        &self,
        artifact: &ResultArtifact,
        motion: &MotionParams,
        observer: &dyn JobObserver,
    ) -> GenerationResult<VideoArtifact> {
        self.video.submit(artifact, motion, observer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_portrait_image() {
        let body = json!({"images": [{"url": "https://cdn/a.jpg", "width": 1024, "height": 768}]});
        let artifact = extract_image(PrimaryModel::Portrait, body).unwrap();
        assert_eq!(artifact.url, "https://cdn/a.jpg");
        assert_eq!(artifact.width, Some(1024));
    }

    #[test]
    fn test_extract_try_on_image() {
        let body = json!({"image": {"url": "https://cdn/t.png", "content_type": "image/png"}});
        let artifact = extract_image(PrimaryModel::TryOn, body).unwrap();
        assert_eq!(artifact.url, "https://cdn/t.png");
        assert_eq!(artifact.media_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_extract_missing_image_is_malformed() {
        for body in [
            json!({}),
            json!({"images": []}),
            json!({"images": [{"url": ""}]}),
            json!({"images": "nope"}),
        ] {
            let err = extract_image(PrimaryModel::Portrait, body).unwrap_err();
            assert!(matches!(err, GenerationError::MalformedResponse(_)), "{:?}", err);
        }
    }

    #[test]
    fn test_extract_ignores_unrelated_fields() {
        let body = json!({
            "images": [{"url": "https://cdn/a.jpg", "width": 1024.0, "height": null}],
            "has_nsfw_concepts": null,
            "seed": -42,
            "timings": {"inference": 3.2},
        });
        let artifact = extract_image(PrimaryModel::Portrait, body).unwrap();
        assert_eq!(artifact.url, "https://cdn/a.jpg");
        assert_eq!(artifact.width, None);
        assert_eq!(artifact.height, None);

        let body = json!({"image": {"url": "https://cdn/t.png"}, "seed": 1.5});
        let artifact = extract_image(PrimaryModel::TryOn, body).unwrap();
        assert_eq!(artifact.url, "https://cdn/t.png");

        let body = json!({"video": {"url": "https://cdn/v.mp4", "file_size": "big"}});
        let video = extract_video(body).unwrap();
        assert_eq!(video.file_size, None);
    }

    #[test]
    fn test_extract_wrong_field_for_model() {
        let body = json!({"images": [{"url": "https://cdn/a.jpg"}]});
        assert!(extract_image(PrimaryModel::TryOn, body).is_err());
    }

    #[test]
    fn test_extract_video() {
        let body = json!({"video": {"url": "https://cdn/v.mp4", "file_size": 1234}});
        let video = extract_video(body).unwrap();
        assert_eq!(video.url, "https://cdn/v.mp4");
        assert_eq!(video.file_size, Some(1234));

        assert!(matches!(
            extract_video(json!({"video": {}})).unwrap_err(),
            GenerationError::MalformedResponse(_)
        ));
    }
}
