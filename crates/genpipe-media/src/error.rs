//! Error types for image encoding.

use std::time::Duration;

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while normalizing an image.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Could not load image: {0}")]
    Decode(String),

    #[error("Image processing timed out after {0:?}")]
    EncodeTimeout(Duration),

    #[error(
        "Image is still {size} bytes at quality {quality:.2}, above the {max_bytes} byte limit"
    )]
    EncodingTooLarge {
        size: usize,
        max_bytes: usize,
        quality: f32,
    },

    #[error("Invalid encoding constraints: {0}")]
    InvalidConstraints(String),

    #[error("Could not compress image: {0}")]
    Encode(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create a decode failure error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Create an encode failure error.
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<image::ImageError> for MediaError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Decoding(e) => MediaError::Decode(e.to_string()),
            image::ImageError::Unsupported(e) => MediaError::Decode(e.to_string()),
            other => MediaError::Encode(other.to_string()),
        }
    }
}
