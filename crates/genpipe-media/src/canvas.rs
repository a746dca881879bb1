//! Rendering onto an opaque white canvas.
//!
//! JPEG has no alpha channel, so transparent pixels are composited over white
//! before resizing.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};

/// Flatten any alpha onto a white background.
pub fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut canvas = RgbImage::new(width, height);

    for (src, dst) in rgba.pixels().zip(canvas.pixels_mut()) {
        let [r, g, b, a] = src.0;
        *dst = Rgb([over_white(r, a), over_white(g, a), over_white(b, a)]);
    }

    canvas
}

fn over_white(channel: u8, alpha: u8) -> u8 {
    let (c, a) = (channel as u32, alpha as u32);
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}

/// Flatten and resize to exactly `width x height`.
pub fn render(image: &DynamicImage, width: u32, height: u32) -> RgbImage {
    let flat = flatten_onto_white(image);

    if flat.dimensions() == (width, height) {
        return flat;
    }

    imageops::resize(&flat, width, height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_transparent_becomes_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0])));
        let flat = flatten_onto_white(&img);
        assert!(flat.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn test_opaque_unchanged() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255])));
        let flat = flatten_onto_white(&img);
        assert!(flat.pixels().all(|p| p.0 == [10, 20, 30]));
    }

    #[test]
    fn test_half_alpha_blends() {
        assert_eq!(over_white(0, 128), 127);
        assert_eq!(over_white(255, 0), 255);
        assert_eq!(over_white(0, 255), 0);
    }

    #[test]
    fn test_render_resizes() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb([200, 100, 50])));
        let out = render(&img, 20, 15);
        assert_eq!(out.dimensions(), (20, 15));
    }
}
