//! Image generation handlers.

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Instant;

use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use genpipe_client::TracingObserver;
use genpipe_models::{
    GenerationParams, PortraitParams, ResultArtifact, SourceImage, TryOnParams,
};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::services::PipelineError;
use crate::state::AppState;

/// Response for a generated image.
#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub image: ResultArtifact,
}

/// POST /api/generate/portrait
///
/// Multipart fields: `referenceImage` (file), `prompt`, and optionally
/// `imageSize`, `numInferenceSteps`, `guidanceScale`, `negativePrompt`,
/// `enableSafetyChecker`.
pub async fn generate_portrait(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<ImageResponse>> {
    let mut form = UploadForm::read(multipart).await?;

    let reference = form
        .take_file("referenceImage")
        .ok_or_else(|| ApiError::validation("Please upload a reference image"))?;

    let mut params = PortraitParams::new(form.text("prompt").unwrap_or_default());
    if let Some(size) = form.parse("imageSize")? {
        params.image_size = size;
    }
    if let Some(steps) = form.parse("numInferenceSteps")? {
        params.num_inference_steps = steps;
    }
    if let Some(scale) = form.parse("guidanceScale")? {
        params.guidance_scale = scale;
    }
    if let Some(negative) = form.text("negativePrompt") {
        params.negative_prompt = negative;
    }
    if let Some(enabled) = form.parse("enableSafetyChecker")? {
        params.enable_safety_checker = enabled;
    }

    let image = run(
        &state,
        "portrait",
        vec![reference],
        GenerationParams::Portrait(params),
    )
    .await?;

    Ok(Json(ImageResponse { image }))
}

/// POST /api/generate/try-on
///
/// Multipart fields: `referenceImage` (person), `garmentImage`, and
/// optionally `size` and `negativePrompt`.
pub async fn generate_try_on(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<ImageResponse>> {
    let mut form = UploadForm::read(multipart).await?;

    let person = form
        .take_file("referenceImage")
        .ok_or_else(|| ApiError::validation("Please upload a photo of the person"))?;
    let garment = form
        .take_file("garmentImage")
        .ok_or_else(|| ApiError::validation("Please upload a garment image"))?;

    let mut params = TryOnParams::default();
    if let Some(size) = form.parse("size")? {
        params.size = size;
    }
    if let Some(negative) = form.text("negativePrompt") {
        params.negative_prompt = negative;
    }

    let image = run(
        &state,
        "try_on",
        vec![person, garment],
        GenerationParams::TryOn(params),
    )
    .await?;

    Ok(Json(ImageResponse { image }))
}

async fn run(
    state: &AppState,
    kind: &str,
    sources: Vec<SourceImage>,
    params: GenerationParams,
) -> Result<ResultArtifact, PipelineError> {
    let started = Instant::now();
    let result = state
        .pipeline
        .run_image_pipeline(sources, params, &TracingObserver)
        .await;

    let outcome = if result.is_ok() { "success" } else { "failure" };
    metrics::record_pipeline(kind, outcome, started.elapsed().as_secs_f64());

    result
}

/// Files and text fields of a multipart upload.
#[derive(Default)]
struct UploadForm {
    files: HashMap<String, SourceImage>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    async fn read(multipart: Result<Multipart, MultipartRejection>) -> ApiResult<Self> {
        let mut multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or("").to_string();
            if name.is_empty() {
                continue;
            }

            if field.file_name().is_some() {
                let image = read_file(field, &name).await?;
                form.files.insert(name, image);
            } else {
                let text = field.text().await.map_err(multipart_error)?;
                form.fields.insert(name, text);
            }
        }

        Ok(form)
    }

    fn take_file(&mut self, name: &str) -> Option<SourceImage> {
        self.files.remove(name)
    }

    /// Non-blank text field.
    fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    fn parse<T>(&self, name: &str) -> ApiResult<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.text(name) {
            None => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|e| ApiError::validation(format!("Invalid {}: {}", name, e))),
        }
    }
}

async fn read_file(field: Field<'_>, name: &str) -> ApiResult<SourceImage> {
    let media_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let file_name = field.file_name().map(str::to_string);
    let bytes = field.bytes().await.map_err(multipart_error)?;

    if bytes.is_empty() {
        return Err(ApiError::validation(format!("Uploaded file '{}' is empty", name)));
    }

    let image = SourceImage::new(bytes.to_vec(), media_type);
    Ok(match file_name {
        Some(file_name) => image.with_file_name(file_name),
        None => image,
    })
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("Upload exceeds the maximum request size".to_string())
    } else {
        ApiError::bad_request(format!("Multipart error: {}", e.body_text()))
    }
}
