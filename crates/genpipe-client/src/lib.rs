//! Client and job orchestrator for the remote generation queue.
//!
//! A submission goes through the same lifecycle on every stage: multipart
//! submit, status polling with log streaming to an observer, result fetch and
//! extraction. The primary (image) and video stages are independent
//! instances of that lifecycle; they share nothing but the HTTP client.

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod observer;
pub mod stages;
pub mod tracker;
pub mod types;

pub use client::{QueueClient, Submission};
pub use config::{ClientConfig, OrchestratorConfig, StageConfig};
pub use error::{GenerationError, GenerationResult};
pub use observer::{JobObserver, JobUpdate, NoopObserver, TracingObserver};
pub use stages::{Orchestrator, PrimaryStage, VideoStage};
pub use tracker::JobTracker;
