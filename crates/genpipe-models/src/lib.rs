//! Shared data models for the genpipe generation pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Source images, encoding constraints and encoded transport assets
//! - Generation parameters for the image and video stages
//! - Remote job handles and their lifecycle status
//! - Result artifacts handed back to callers

pub mod artifact;
pub mod image;
pub mod job;
pub mod params;
pub mod request;

// Re-export common types
pub use artifact::{ResultArtifact, VideoArtifact};
pub use image::{EncodedAsset, EncodingConstraints, SourceImage};
pub use job::{JobHandle, JobId, JobStatus, QueueStatus, StageKind};
pub use params::{
    GarmentSize, GenerationParams, ImageSize, MotionParams, ParamParseError, PortraitParams,
    PrimaryModel, TryOnParams, VideoAspectRatio, VideoDuration, VideoResolution,
};
pub use request::GenerationRequest;
