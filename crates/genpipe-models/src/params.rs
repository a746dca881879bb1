//! Generation parameters for the image and video stages.
//!
//! Every enum round-trips through its wire string (`FromStr` / `Display`),
//! which is also how it appears in multipart form fields.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default negative prompt for portrait synthesis.
pub const DEFAULT_PORTRAIT_NEGATIVE_PROMPT: &str =
    "bad quality, worst quality, text, signature, watermark, extra limbs";
/// Default negative prompt for virtual try-on.
pub const DEFAULT_TRY_ON_NEGATIVE_PROMPT: &str = "bad quality, worst quality, blurry, distorted";
/// Default number of diffusion steps.
pub const DEFAULT_INFERENCE_STEPS: u32 = 50;
/// Default classifier-free guidance scale.
pub const DEFAULT_GUIDANCE_SCALE: f32 = 17.5;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown {kind}: {value}")]
pub struct ParamParseError {
    kind: &'static str,
    value: String,
}

impl ParamParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident => $wire:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $wire)] $variant,)+
        }

        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// Wire representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParamParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($wire => Ok($name::$variant),)+
                    other => Err(ParamParseError::new($kind, other)),
                }
            }
        }
    };
}

wire_enum! {
    /// Output image size preset for portrait synthesis.
    ImageSize, "image size" {
        SquareHd => "square_hd",
        Square => "square",
        Portrait4x3 => "portrait_4_3",
        Portrait16x9 => "portrait_16_9",
        Landscape4x3 => "landscape_4_3",
        Landscape16x9 => "landscape_16_9",
    }
}

impl Default for ImageSize {
    fn default() -> Self {
        ImageSize::Landscape4x3
    }
}

wire_enum! {
    /// Garment fit for virtual try-on.
    GarmentSize, "garment size" {
        Small => "S",
        Medium => "M",
        Large => "L",
        ExtraLarge => "XL",
    }
}

impl Default for GarmentSize {
    fn default() -> Self {
        GarmentSize::Medium
    }
}

wire_enum! {
    /// Target aspect ratio of the generated video.
    VideoAspectRatio, "aspect ratio" {
        Landscape16x9 => "16:9",
        Portrait9x16 => "9:16",
        Landscape4x3 => "4:3",
        Portrait3x4 => "3:4",
        Cinema21x9 => "21:9",
        Tall9x21 => "9:21",
        Square => "1:1",
    }
}

impl Default for VideoAspectRatio {
    fn default() -> Self {
        VideoAspectRatio::Landscape16x9
    }
}

wire_enum! {
    /// Output resolution of the generated video.
    VideoResolution, "resolution" {
        P540 => "540p",
        P720 => "720p",
        P1080 => "1080p",
    }
}

impl Default for VideoResolution {
    fn default() -> Self {
        VideoResolution::P720
    }
}

wire_enum! {
    /// Clip length of the generated video.
    VideoDuration, "duration" {
        Seconds5 => "5s",
        Seconds9 => "9s",
    }
}

impl Default for VideoDuration {
    fn default() -> Self {
        VideoDuration::Seconds5
    }
}

/// Which primary-stage model a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryModel {
    /// Identity-preserving portrait synthesis from one reference photo
    Portrait,
    /// Virtual try-on from a person photo and a garment photo
    TryOn,
}

impl PrimaryModel {
    /// Multipart part names of the image assets, in submission order.
    pub fn asset_parts(&self) -> &'static [&'static str] {
        match self {
            PrimaryModel::Portrait => &["reference_image"],
            PrimaryModel::TryOn => &["human_image", "garment_image"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PrimaryModel::Portrait => "portrait",
            PrimaryModel::TryOn => "try_on",
        }
    }
}

impl fmt::Display for PrimaryModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for portrait synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortraitParams {
    /// Description of the desired image
    pub prompt: String,
    #[serde(default)]
    pub image_size: ImageSize,
    #[serde(default = "default_inference_steps")]
    pub num_inference_steps: u32,
    #[serde(default = "default_guidance_scale")]
    pub guidance_scale: f32,
    #[serde(default = "default_portrait_negative_prompt")]
    pub negative_prompt: String,
    #[serde(default = "default_true")]
    pub enable_safety_checker: bool,
}

fn default_inference_steps() -> u32 {
    DEFAULT_INFERENCE_STEPS
}
fn default_guidance_scale() -> f32 {
    DEFAULT_GUIDANCE_SCALE
}
fn default_portrait_negative_prompt() -> String {
    DEFAULT_PORTRAIT_NEGATIVE_PROMPT.to_string()
}
fn default_try_on_negative_prompt() -> String {
    DEFAULT_TRY_ON_NEGATIVE_PROMPT.to_string()
}
fn default_true() -> bool {
    true
}

impl PortraitParams {
    /// Create parameters with defaults for everything but the prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image_size: ImageSize::default(),
            num_inference_steps: DEFAULT_INFERENCE_STEPS,
            guidance_scale: DEFAULT_GUIDANCE_SCALE,
            negative_prompt: DEFAULT_PORTRAIT_NEGATIVE_PROMPT.to_string(),
            enable_safety_checker: true,
        }
    }
}

/// Parameters for virtual try-on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TryOnParams {
    #[serde(default)]
    pub size: GarmentSize,
    #[serde(default = "default_try_on_negative_prompt")]
    pub negative_prompt: String,
}

impl Default for TryOnParams {
    fn default() -> Self {
        Self {
            size: GarmentSize::default(),
            negative_prompt: DEFAULT_TRY_ON_NEGATIVE_PROMPT.to_string(),
        }
    }
}

/// Named generation options for the primary stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum GenerationParams {
    Portrait(PortraitParams),
    TryOn(TryOnParams),
}

impl GenerationParams {
    pub fn model(&self) -> PrimaryModel {
        match self {
            GenerationParams::Portrait(_) => PrimaryModel::Portrait,
            GenerationParams::TryOn(_) => PrimaryModel::TryOn,
        }
    }

    /// Scalar form fields in submission order.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            GenerationParams::Portrait(p) => vec![
                ("prompt", p.prompt.clone()),
                ("image_size", p.image_size.to_string()),
                ("num_inference_steps", p.num_inference_steps.to_string()),
                ("guidance_scale", p.guidance_scale.to_string()),
                ("negative_prompt", p.negative_prompt.clone()),
                ("enable_safety_checker", p.enable_safety_checker.to_string()),
            ],
            GenerationParams::TryOn(p) => vec![
                ("size", p.size.to_string()),
                ("negative_prompt", p.negative_prompt.clone()),
            ],
        }
    }

    /// Check that every required option is present.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            GenerationParams::Portrait(p) => {
                if p.prompt.trim().is_empty() {
                    return Err("Please enter a vision description".to_string());
                }
                if p.num_inference_steps == 0 {
                    return Err("Inference step count must be specified".to_string());
                }
                Ok(())
            }
            GenerationParams::TryOn(_) => Ok(()),
        }
    }
}

/// Parameters for the video stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionParams {
    /// Description of the desired motion
    pub prompt: String,
    #[serde(default)]
    pub aspect_ratio: VideoAspectRatio,
    #[serde(default)]
    pub resolution: VideoResolution,
    #[serde(default)]
    pub duration: VideoDuration,
}

impl MotionParams {
    /// Create parameters with defaults for everything but the prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            aspect_ratio: VideoAspectRatio::default(),
            resolution: VideoResolution::default(),
            duration: VideoDuration::default(),
        }
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: VideoAspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_resolution(mut self, resolution: VideoResolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_duration(mut self, duration: VideoDuration) -> Self {
        self.duration = duration;
        self
    }

    /// Scalar form fields (without the source image reference).
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("prompt", self.prompt.clone()),
            ("aspect_ratio", self.aspect_ratio.to_string()),
            ("resolution", self.resolution.to_string()),
            ("duration", self.duration.to_string()),
        ]
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.prompt.trim().is_empty() {
            return Err("Motion prompt is required".to_string());
        }
        Ok(())
    }
}
