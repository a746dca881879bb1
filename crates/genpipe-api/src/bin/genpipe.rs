//! Command-line front end for the generation pipeline.
//!
//! Usage:
//!   genpipe encode photo.png -o photo.jpg
//!   genpipe portrait face.jpg --prompt "a knight in silver armor"
//!   genpipe try-on person.jpg garment.png --size L
//!   genpipe video https://cdn.example/portrait.jpg --prompt "slow pan"

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use genpipe_api::{logging, Pipeline};
use genpipe_client::TracingObserver;
use genpipe_media::{EncoderConfig, ImageEncoder};
use genpipe_models::{
    EncodingConstraints, GarmentSize, GenerationParams, ImageSize, MotionParams, PortraitParams,
    ResultArtifact, SourceImage, TryOnParams, VideoAspectRatio, VideoDuration, VideoResolution,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "genpipe", version, about = "Generate images and videos from reference photos")]
struct Cli {
    /// Maximum width of encoded uploads
    #[arg(long, global = true, default_value_t = genpipe_models::image::DEFAULT_MAX_WIDTH)]
    max_width: u32,

    /// Maximum height of encoded uploads
    #[arg(long, global = true, default_value_t = genpipe_models::image::DEFAULT_MAX_HEIGHT)]
    max_height: u32,

    /// Byte ceiling of encoded uploads
    #[arg(long, global = true, default_value_t = genpipe_models::image::DEFAULT_MAX_BYTES)]
    max_bytes: usize,

    /// Starting JPEG quality in (0, 1]
    #[arg(long, global = true, default_value_t = genpipe_models::image::DEFAULT_QUALITY)]
    quality: f32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fit and compress an image locally without contacting the service
    Encode {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Generate a portrait from a reference photo
    Portrait {
        reference: PathBuf,
        #[arg(short, long)]
        prompt: String,
        #[arg(long, default_value = "landscape_4_3")]
        image_size: ImageSize,
        #[arg(long)]
        steps: Option<u32>,
        #[arg(long)]
        guidance_scale: Option<f32>,
        #[arg(long)]
        negative_prompt: Option<String>,
        #[arg(long)]
        disable_safety_checker: bool,
    },
    /// Dress a person in a garment
    TryOn {
        person: PathBuf,
        garment: PathBuf,
        #[arg(long, default_value = "M")]
        size: GarmentSize,
        #[arg(long)]
        negative_prompt: Option<String>,
    },
    /// Animate a generated image
    Video {
        image_url: String,
        #[arg(short, long)]
        prompt: String,
        #[arg(long, default_value = "16:9")]
        aspect_ratio: VideoAspectRatio,
        #[arg(long, default_value = "720p")]
        resolution: VideoResolution,
        #[arg(long, default_value = "5s")]
        duration: VideoDuration,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init_tracing("genpipe=info,genpipe_api=info,genpipe_client=info,genpipe_media=info");

    let cli = Cli::parse();
    let constraints = EncodingConstraints::new(cli.max_width, cli.max_height, cli.max_bytes)
        .with_quality(cli.quality);

    match cli.command {
        Command::Encode { input, output } => {
            let source = load_source(&input).await?;
            let asset = ImageEncoder::new(EncoderConfig::from_env())
                .encode(source, &constraints)
                .await?;
            tokio::fs::write(&output, &asset.bytes)
                .await
                .with_context(|| format!("failed to write {}", output.display()))?;
            info!(
                output = %output.display(),
                width = asset.width,
                height = asset.height,
                bytes = asset.len(),
                attempts = asset.attempts,
                "Encoded image written"
            );
        }
        Command::Portrait {
            reference,
            prompt,
            image_size,
            steps,
            guidance_scale,
            negative_prompt,
            disable_safety_checker,
        } => {
            let mut params = PortraitParams::new(prompt);
            params.image_size = image_size;
            if let Some(steps) = steps {
                params.num_inference_steps = steps;
            }
            if let Some(scale) = guidance_scale {
                params.guidance_scale = scale;
            }
            if let Some(negative) = negative_prompt {
                params.negative_prompt = negative;
            }
            params.enable_safety_checker = !disable_safety_checker;

            let sources = vec![load_source(&reference).await?];
            let artifact = Pipeline::from_env(constraints)?
                .run_image_pipeline(sources, GenerationParams::Portrait(params), &TracingObserver)
                .await?;
            print_json(&artifact)?;
        }
        Command::TryOn {
            person,
            garment,
            size,
            negative_prompt,
        } => {
            let mut params = TryOnParams {
                size,
                ..TryOnParams::default()
            };
            if let Some(negative) = negative_prompt {
                params.negative_prompt = negative;
            }

            let sources = vec![load_source(&person).await?, load_source(&garment).await?];
            let artifact = Pipeline::from_env(constraints)?
                .run_image_pipeline(sources, GenerationParams::TryOn(params), &TracingObserver)
                .await?;
            print_json(&artifact)?;
        }
        Command::Video {
            image_url,
            prompt,
            aspect_ratio,
            resolution,
            duration,
        } => {
            let motion = MotionParams::new(prompt)
                .with_aspect_ratio(aspect_ratio)
                .with_resolution(resolution)
                .with_duration(duration);
            let video = Pipeline::from_env(constraints)?
                .run_video_pipeline(&ResultArtifact::from_url(image_url), motion)
                .await?;
            print_json(&video)?;
        }
    }

    Ok(())
}

async fn load_source(path: &Path) -> Result<SourceImage> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let media_type = match path.extension().and_then(|e| e.to_str()).map(str::to_lowercase) {
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "webp" => "image/webp",
        Some(ext) if ext == "gif" => "image/gif",
        Some(ext) if ext == "bmp" => "image/bmp",
        _ => "application/octet-stream",
    };
    let mut source = SourceImage::new(bytes, media_type);
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        source = source.with_file_name(name);
    }
    Ok(source)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
