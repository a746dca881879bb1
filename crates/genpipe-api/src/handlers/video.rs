//! Video generation handler.

use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use genpipe_models::{MotionParams, ResultArtifact};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Request body for `POST /api/generate-video`.
#[derive(Debug, Default, Deserialize)]
pub struct VideoRequest {
    #[serde(default, rename = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default, alias = "aspectRatio")]
    pub aspect_ratio: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    pub video_url: String,
}

/// POST /api/generate-video
pub async fn generate_video(
    State(state): State<AppState>,
    payload: Result<Json<VideoRequest>, JsonRejection>,
) -> ApiResult<Json<VideoResponse>> {
    let Json(req) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let (image_url, prompt) = match (non_blank(req.image_url), non_blank(req.prompt)) {
        (Some(url), Some(prompt)) => (url, prompt),
        _ => return Err(ApiError::bad_request("Image URL and prompt are required")),
    };

    match Url::parse(&image_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => return Err(ApiError::validation("Image URL must be an http(s) URL")),
    }

    let mut motion = MotionParams::new(prompt);
    if let Some(aspect_ratio) = non_blank(req.aspect_ratio) {
        motion = motion.with_aspect_ratio(aspect_ratio.parse().map_err(invalid)?);
    }
    if let Some(resolution) = non_blank(req.resolution) {
        motion = motion.with_resolution(resolution.parse().map_err(invalid)?);
    }
    if let Some(duration) = non_blank(req.duration) {
        motion = motion.with_duration(duration.parse().map_err(invalid)?);
    }

    let artifact = ResultArtifact::from_url(image_url);

    let started = Instant::now();
    let result = state.pipeline.run_video_pipeline(&artifact, motion).await;
    let outcome = if result.is_ok() { "success" } else { "failure" };
    metrics::record_pipeline("video", outcome, started.elapsed().as_secs_f64());

    let video = result?;
    Ok(Json(VideoResponse {
        video_url: video.url,
    }))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn invalid(e: genpipe_models::ParamParseError) -> ApiError {
    ApiError::validation(e.to_string())
}
