//! Image payload models: what the caller hands in and what goes on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default maximum output width in pixels.
pub const DEFAULT_MAX_WIDTH: u32 = 1024;
/// Default maximum output height in pixels.
pub const DEFAULT_MAX_HEIGHT: u32 = 1024;
/// Default transport payload ceiling (4 MiB).
pub const DEFAULT_MAX_BYTES: usize = 4 * 1024 * 1024;
/// Default starting JPEG quality on the (0, 1] scale.
pub const DEFAULT_QUALITY: f32 = 0.8;

/// Media type of every encoded transport asset.
pub const JPEG_MEDIA_TYPE: &str = "image/jpeg";

/// Raw image as supplied by the user.
///
/// Owned by the caller and consumed by a single encoder invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceImage {
    /// Raw file bytes
    pub bytes: Vec<u8>,
    /// Declared media type (e.g. "image/png"); informational only
    pub media_type: String,
    /// Original file name, if known
    pub file_name: Option<String>,
}

impl SourceImage {
    /// Create a source image from raw bytes and a declared media type.
    pub fn new(bytes: impl Into<Vec<u8>>, media_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            media_type: media_type.into(),
            file_name: None,
        }
    }

    /// Attach the original file name.
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Size of the raw payload in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceImage")
            .field("len", &self.bytes.len())
            .field("media_type", &self.media_type)
            .field("file_name", &self.file_name)
            .finish()
    }
}

/// Target bounds for one encoder call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncodingConstraints {
    /// Maximum output width in pixels
    #[serde(default = "default_max_width")]
    pub max_width: u32,
    /// Maximum output height in pixels
    #[serde(default = "default_max_height")]
    pub max_height: u32,
    /// Maximum encoded size in bytes
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
    /// Starting JPEG quality in (0, 1]
    #[serde(default = "default_quality")]
    pub quality: f32,
}

fn default_max_width() -> u32 {
    DEFAULT_MAX_WIDTH
}
fn default_max_height() -> u32 {
    DEFAULT_MAX_HEIGHT
}
fn default_max_bytes() -> usize {
    DEFAULT_MAX_BYTES
}
fn default_quality() -> f32 {
    DEFAULT_QUALITY
}

impl Default for EncodingConstraints {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
            max_bytes: DEFAULT_MAX_BYTES,
            quality: DEFAULT_QUALITY,
        }
    }
}

impl EncodingConstraints {
    /// Create constraints with the default starting quality.
    pub fn new(max_width: u32, max_height: u32, max_bytes: usize) -> Self {
        Self {
            max_width,
            max_height,
            max_bytes,
            quality: DEFAULT_QUALITY,
        }
    }

    /// Override the starting quality.
    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = quality;
        self
    }

    /// Validate the constraints.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err(format!(
                "Maximum dimensions must be non-zero (got {}x{})",
                self.max_width, self.max_height
            ));
        }

        if self.max_bytes == 0 {
            return Err("Maximum byte size must be non-zero".to_string());
        }

        if !(self.quality > 0.0 && self.quality <= 1.0) {
            return Err(format!("Quality must be in (0, 1], got {}", self.quality));
        }

        Ok(())
    }
}

/// Size-bounded JPEG produced by the encoder.
#[derive(Clone, PartialEq)]
pub struct EncodedAsset {
    /// Encoded JPEG bytes
    pub bytes: Vec<u8>,
    /// Always "image/jpeg"
    pub media_type: String,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Quality the final encode used
    pub quality: f32,
    /// Number of encodes performed (1 = no retry)
    pub attempts: u32,
}

impl EncodedAsset {
    /// Create a JPEG asset.
    pub fn jpeg(bytes: Vec<u8>, width: u32, height: u32, quality: f32, attempts: u32) -> Self {
        Self {
            bytes,
            media_type: JPEG_MEDIA_TYPE.to_string(),
            width,
            height,
            quality,
            attempts,
        }
    }

    /// Encoded size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for EncodedAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedAsset")
            .field("len", &self.bytes.len())
            .field("media_type", &self.media_type)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("quality", &self.quality)
            .field("attempts", &self.attempts)
            .finish()
    }
}
