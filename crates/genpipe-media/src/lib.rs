//! Adaptive image encoder for generation payloads.
//!
//! This crate provides:
//! - Aspect-preserving fitting of arbitrary images into a bounding box
//! - Flattening of transparent images onto a white canvas
//! - Bounded JPEG re-encoding until a byte ceiling is met
//! - Wall-clock timeout around the whole decode/encode

pub mod canvas;
pub mod encoder;
pub mod error;
pub mod fit;
pub mod jpeg;

pub use encoder::{EncoderConfig, ImageEncoder};
pub use error::{MediaError, MediaResult};
pub use fit::fit_within;
