//! JPEG encoding at a fractional quality.

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, RgbImage};

use crate::error::{MediaError, MediaResult};

/// Map a (0, 1] quality onto the codec's 1-100 scale.
pub fn codec_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Encode an RGB canvas as baseline JPEG.
pub fn encode_jpeg(canvas: &RgbImage, quality: f32) -> MediaResult<Vec<u8>> {
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 {
        return Err(MediaError::encode(format!(
            "invalid canvas dimensions {}x{}",
            width, height
        )));
    }

    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, codec_quality(quality));
    encoder.encode(canvas.as_raw(), width, height, ColorType::Rgb8)?;

    Ok(buffer)
}
