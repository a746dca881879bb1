//! Business logic services.

pub mod pipeline;

pub use pipeline::{Pipeline, PipelineError};
