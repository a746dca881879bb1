//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use genpipe_client::GenerationError;
use genpipe_media::MediaError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::services::PipelineError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Pipeline(e) => match e {
                PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                PipelineError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
                PipelineError::Media(e) => match e {
                    MediaError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    MediaError::EncodingTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                    MediaError::EncodeTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
                    MediaError::InvalidConstraints(_)
                    | MediaError::Encode(_)
                    | MediaError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                },
                PipelineError::Generation(e) => match e {
                    GenerationError::Transport(_)
                    | GenerationError::MalformedResponse(_)
                    | GenerationError::GenerationFailed { .. } => StatusCode::BAD_GATEWAY,
                    GenerationError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                    GenerationError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                    GenerationError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
                },
            },
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Validation(_) => "validation_error",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::Pipeline(e) => match e {
                PipelineError::InvalidInput(_) => "validation_error",
                PipelineError::ShuttingDown => "service_unavailable",
                PipelineError::Media(e) => match e {
                    MediaError::Decode(_) => "decode_error",
                    MediaError::EncodingTooLarge { .. } => "encoding_too_large",
                    MediaError::EncodeTimeout(_) => "encode_timeout",
                    MediaError::InvalidConstraints(_)
                    | MediaError::Encode(_)
                    | MediaError::Internal(_) => "internal_error",
                },
                PipelineError::Generation(e) => e.kind(),
            },
        }
    }

    fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

/// Response extension set on 500 responses so the detail can be withheld
/// in production (see [`crate::middleware::hide_internal_errors`]).
#[derive(Debug, Clone, Copy)]
pub struct InternalErrorDetail {
    pub code: &'static str,
}

/// Generic body that replaces internal error details.
pub fn redacted_response(status: StatusCode, code: &'static str) -> Response {
    let body = ErrorResponse {
        error: "An internal error occurred".to_string(),
        code,
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(status = status.as_u16(), code = self.code(), "{}", self);
        } else {
            warn!(status = status.as_u16(), code = self.code(), "{}", self);
        }

        let code = self.code();
        let body = ErrorResponse {
            error: self.to_string(),
            code,
        };

        let mut response = (status, Json(body)).into_response();
        if self.is_internal() {
            response
                .extensions_mut()
                .insert(InternalErrorDetail { code });
        }
        response
    }
}
