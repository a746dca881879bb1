//! Axum HTTP API for the generation pipeline.
//!
//! This crate provides:
//! - Multipart endpoints for portrait and try-on generation
//! - A JSON endpoint that animates a generated image
//! - The pipeline service shared by the server and the `genpipe` CLI
//! - Security headers, request IDs and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{Pipeline, PipelineError};
pub use state::AppState;
