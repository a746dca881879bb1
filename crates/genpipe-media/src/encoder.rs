//! Adaptive encoder: decode, fit, flatten, then re-encode until the payload
//! fits its byte ceiling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::GenericImageView;
use tracing::{debug, info, instrument, warn};

use genpipe_models::{EncodedAsset, EncodingConstraints, SourceImage};

use crate::canvas::render;
use crate::error::{MediaError, MediaResult};
use crate::fit::fit_within;
use crate::jpeg::encode_jpeg;

/// Retry policy and time budget for the encoder.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Wall-clock budget for decode plus all encode attempts
    pub timeout: Duration,
    /// Quality multiplier applied after each oversized attempt
    pub quality_step: f32,
    /// Quality below which no further attempt is made
    pub min_quality: f32,
    /// Maximum number of encodes per call
    pub max_attempts: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            quality_step: 0.8,
            min_quality: 0.1,
            max_attempts: 10,
        }
    }
}

impl EncoderConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout: std::env::var("ENCODER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            quality_step: defaults.quality_step,
            min_quality: std::env::var("ENCODER_MIN_QUALITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_quality),
            max_attempts: std::env::var("ENCODER_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_attempts),
        }
    }
}

/// Normalizes user images into size-bounded JPEG transport payloads.
#[derive(Debug, Clone, Default)]
pub struct ImageEncoder {
    config: EncoderConfig,
}

impl ImageEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Encode `source` within `constraints`.
    ///
    /// Decoding and encoding run on the blocking pool. If the whole operation
    /// exceeds the configured timeout the call fails with
    /// [`MediaError::EncodeTimeout`] and the blocking work stops before its
    /// next encode attempt.
    #[instrument(skip_all, fields(source_len = source.len(), media_type = %source.media_type))]
    pub async fn encode(
        &self,
        source: SourceImage,
        constraints: &EncodingConstraints,
    ) -> MediaResult<EncodedAsset> {
        constraints
            .validate()
            .map_err(MediaError::InvalidConstraints)?;

        let constraints = *constraints;
        let config = self.config.clone();
        let timeout = config.timeout;
        let cancelled = Arc::new(AtomicBool::new(false));

        let task = tokio::task::spawn_blocking({
            let cancelled = Arc::clone(&cancelled);
            move || encode_blocking(&source, &constraints, &config, &cancelled)
        });

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(MediaError::internal(format!(
                "encoder task failed: {}",
                join_err
            ))),
            Err(_) => {
                cancelled.store(true, Ordering::Relaxed);
                warn!(timeout_secs = timeout.as_secs_f64(), "Image processing timed out");
                Err(MediaError::EncodeTimeout(timeout))
            }
        }
    }
}

/// Synchronous encoder body. Dimensions are fixed after the fit; only the
/// quality changes between attempts. `cancelled` is checked before every
/// attempt.
pub fn encode_blocking(
    source: &SourceImage,
    constraints: &EncodingConstraints,
    config: &EncoderConfig,
    cancelled: &AtomicBool,
) -> MediaResult<EncodedAsset> {
    let image =
        image::load_from_memory(&source.bytes).map_err(|e| MediaError::decode(e.to_string()))?;

    let (src_width, src_height) = image.dimensions();
    let (width, height) = fit_within(
        src_width,
        src_height,
        constraints.max_width,
        constraints.max_height,
    );

    debug!(src_width, src_height, width, height, "Fitted image dimensions");

    let canvas = render(&image, width, height);
    drop(image);

    let max_attempts = config.max_attempts.max(1);
    let mut quality = constraints.quality;
    let mut attempts = 0;

    loop {
        if cancelled.load(Ordering::Relaxed) {
            debug!(attempts, "Encoding abandoned after timeout");
            return Err(MediaError::EncodeTimeout(config.timeout));
        }

        attempts += 1;
        let bytes = encode_jpeg(&canvas, quality)?;

        if bytes.len() <= constraints.max_bytes {
            info!(
                size = bytes.len(),
                width,
                height,
                quality,
                attempts,
                "Compressed image"
            );
            return Ok(EncodedAsset::jpeg(bytes, width, height, quality, attempts));
        }

        let next = quality * config.quality_step;
        if attempts >= max_attempts || next < config.min_quality {
            warn!(
                size = bytes.len(),
                max_bytes = constraints.max_bytes,
                quality,
                attempts,
                "Image cannot be compressed under the size limit"
            );
            return Err(MediaError::EncodingTooLarge {
                size: bytes.len(),
                max_bytes: constraints.max_bytes,
                quality,
            });
        }

        debug!(
            size = bytes.len(),
            quality,
            next_quality = next,
            "Image still too large, compressing further"
        );
        quality = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                128,
            ])
        })
    }

    /// High-entropy pattern that JPEG cannot compress well.
    fn noise(width: u32, height: u32) -> RgbImage {
        let mut state: u32 = 0x1234_5678;
        RgbImage::from_fn(width, height, |_, _| {
            let mut next = || {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 24) as u8
            };
            Rgb([next(), next(), next()])
        })
    }

    fn to_source(image: DynamicImage, format: ImageOutputFormat, media_type: &str) -> SourceImage {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, format).unwrap();
        SourceImage::new(buf.into_inner(), media_type)
    }

    fn bmp_source(image: RgbImage) -> SourceImage {
        to_source(DynamicImage::ImageRgb8(image), ImageOutputFormat::Bmp, "image/bmp")
    }

    fn test_encoder() -> ImageEncoder {
        ImageEncoder::new(EncoderConfig {
            timeout: Duration::from_secs(120),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_landscape_photo_end_to_end() {
        let source = bmp_source(gradient(4000, 3000));
        let constraints = EncodingConstraints::new(1024, 1024, 4 * 1024 * 1024);

        let asset = test_encoder().encode(source, &constraints).await.unwrap();

        assert_eq!((asset.width, asset.height), (1024, 768));
        assert!(asset.len() <= 4 * 1024 * 1024);
        assert_eq!(asset.media_type, "image/jpeg");
        assert_eq!(&asset.bytes[0..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&asset.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (1024, 768));
    }

    #[tokio::test]
    async fn test_portrait_photo_bounded_by_height() {
        let source = bmp_source(gradient(1500, 2000));
        let constraints = EncodingConstraints::new(1024, 1024, 4 * 1024 * 1024);

        let asset = test_encoder().encode(source, &constraints).await.unwrap();

        assert_eq!((asset.width, asset.height), (768, 1024));
    }

    #[tokio::test]
    async fn test_small_image_not_upscaled() {
        let source = bmp_source(gradient(200, 100));
        let asset = test_encoder()
            .encode(source, &EncodingConstraints::default())
            .await
            .unwrap();
        assert_eq!((asset.width, asset.height), (200, 100));
    }

    #[tokio::test]
    async fn test_dimensions_deterministic() {
        let image = gradient(900, 700);
        let constraints = EncodingConstraints::new(512, 512, 4 * 1024 * 1024);
        let encoder = test_encoder();

        let first = encoder.encode(bmp_source(image.clone()), &constraints).await.unwrap();
        let second = encoder.encode(bmp_source(image), &constraints).await.unwrap();

        assert_eq!((first.width, first.height), (second.width, second.height));
        assert_eq!((first.width, first.height), (512, 398));
    }

    #[tokio::test]
    async fn test_no_retry_when_first_encode_fits() {
        let source = bmp_source(gradient(300, 200));
        let asset = test_encoder()
            .encode(source, &EncodingConstraints::default())
            .await
            .unwrap();

        assert_eq!(asset.attempts, 1);
        assert!((asset.quality - 0.8).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_retries_with_lower_quality_until_fit() {
        let image = noise(256, 256);
        let encoder = test_encoder();

        let baseline = encoder
            .encode(
                bmp_source(image.clone()),
                &EncodingConstraints::new(1024, 1024, usize::MAX).with_quality(0.95),
            )
            .await
            .unwrap();
        assert_eq!(baseline.attempts, 1);

        let limit = baseline.len() - 1;
        let asset = encoder
            .encode(
                bmp_source(image),
                &EncodingConstraints::new(1024, 1024, limit).with_quality(0.95),
            )
            .await
            .unwrap();

        assert!(asset.attempts >= 2);
        assert!(asset.quality < 0.95);
        assert!(asset.len() <= limit);
        assert_eq!((asset.width, asset.height), (256, 256));
    }

    #[tokio::test]
    async fn test_unreachable_ceiling_fails_instead_of_looping() {
        let source = bmp_source(gradient(64, 64));
        let constraints = EncodingConstraints::new(1024, 1024, 64);

        let err = test_encoder().encode(source, &constraints).await.unwrap_err();

        match err {
            MediaError::EncodingTooLarge {
                size,
                max_bytes,
                quality,
            } => {
                assert!(size > 64);
                assert_eq!(max_bytes, 64);
                assert!(quality >= 0.1 && quality < 0.15, "quality {}", quality);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_attempt_cap_respected() {
        let encoder = ImageEncoder::new(EncoderConfig {
            max_attempts: 2,
            ..Default::default()
        });
        let source = bmp_source(gradient(64, 64));

        let err = encoder
            .encode(source, &EncodingConstraints::new(1024, 1024, 64))
            .await
            .unwrap_err();

        match err {
            MediaError::EncodingTooLarge { quality, .. } => {
                assert!((quality - 0.64).abs() < 1e-4, "quality {}", quality);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transparent_pixels_become_white() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(32, 32, Rgba([0, 0, 0, 0])));
        let source = to_source(image, ImageOutputFormat::Png, "image/png");

        let asset = test_encoder()
            .encode(source, &EncodingConstraints::default())
            .await
            .unwrap();

        let decoded = image::load_from_memory(&asset.bytes).unwrap().to_rgb8();
        assert!(decoded.pixels().all(|p| p.0.iter().all(|c| *c >= 245)));
    }

    #[tokio::test]
    async fn test_garbage_bytes_fail_to_decode() {
        let source = SourceImage::new(b"definitely not an image".to_vec(), "image/jpeg");
        let err = test_encoder()
            .encode(source, &EncodingConstraints::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Decode(_)));
    }

    #[tokio::test]
    async fn test_invalid_constraints_rejected() {
        let source = bmp_source(gradient(10, 10));
        let err = test_encoder()
            .encode(source, &EncodingConstraints::new(0, 1024, 1024))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidConstraints(_)));
    }

    #[tokio::test]
    async fn test_timeout_reported() {
        let source = bmp_source(gradient(3000, 3000));
        let encoder = ImageEncoder::new(EncoderConfig {
            timeout: Duration::from_nanos(1),
            ..Default::default()
        });

        let err = encoder
            .encode(source, &EncodingConstraints::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::EncodeTimeout(_)));
    }

    #[test]
    fn test_cancelled_encode_stops_before_attempting() {
        let source = bmp_source(gradient(64, 64));
        let cancelled = AtomicBool::new(true);

        let err = encode_blocking(
            &source,
            &EncodingConstraints::default(),
            &EncoderConfig::default(),
            &cancelled,
        )
        .unwrap_err();
        assert!(matches!(err, MediaError::EncodeTimeout(_)));

        let asset = encode_blocking(
            &source,
            &EncodingConstraints::default(),
            &EncoderConfig::default(),
            &AtomicBool::new(false),
        )
        .unwrap();
        assert_eq!(asset.attempts, 1);
    }

    #[test]
    fn test_timeout_message_keeps_sub_second_precision() {
        let err = MediaError::EncodeTimeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "Image processing timed out after 250ms");
    }

    #[test]
    fn test_config_defaults() {
        let config = EncoderConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_attempts, 10);
        assert!((config.min_quality - 0.1).abs() < f32::EPSILON);
    }
}
