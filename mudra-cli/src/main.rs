// Mudra command line interface
// Recognize hand gestures in still images and inspect model descriptors

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use mudra_eye::fetch::{ArtifactFetcher, DefaultFetcher};
use mudra_eye::frame::encode_data_url;
use mudra_eye::models::descriptor::input_size_from_shape;
use mudra_eye::models::{LabelTable, ModelDescriptor, ModelRuntime};
use mudra_eye::{FrameSource, InferenceContext, RecognizerConfig, ResizePolicy};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "mudra")]
#[command(about = "Mudra - hand gesture recognition from camera frames", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (TOML)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Model descriptor URL or path
    #[arg(long, global = true)]
    model: Option<String>,

    /// Label table URL or path
    #[arg(long, global = true)]
    labels: Option<String>,

    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Recognize the gesture in an image file
    Recognize {
        /// Image file (png, jpeg, gif, bmp, webp)
        image: PathBuf,

        /// Input size used when the model declares none
        #[arg(long)]
        input_size: Option<u32>,

        /// Letterbox the frame instead of stretching it
        #[arg(long)]
        pad: bool,
    },

    /// Show what a model descriptor declares
    Inspect,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(model) = cli.model {
        config.model_url = model;
    }
    if let Some(labels) = cli.labels {
        config.labels_url = labels;
    }

    match cli.command {
        Commands::Recognize { image, input_size, pad } => {
            if let Some(size) = input_size {
                config.default_input_size = size;
            }
            if pad {
                config.resize_policy = ResizePolicy::Pad { fill: [0, 0, 0] };
            }
            recognize(config, &image).await?;
        }
        Commands::Inspect => {
            inspect(&config).await?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RecognizerConfig> {
    match path {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            RecognizerConfig::from_file(path).with_context(|| format!("Failed to load config {}", path.display()))
        }
        None => Ok(RecognizerConfig::default()),
    }
}

/// MIME type for an image file, from its extension
fn mime_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

#[cfg(feature = "onnx")]
fn runtime() -> anyhow::Result<Arc<dyn ModelRuntime>> {
    Ok(Arc::new(mudra_eye::models::OnnxRuntime::new()))
}

#[cfg(not(feature = "onnx"))]
fn runtime() -> anyhow::Result<Arc<dyn ModelRuntime>> {
    bail!("No model runtime compiled in; rebuild with `--features onnx`")
}

async fn recognize(config: RecognizerConfig, image: &Path) -> anyhow::Result<()> {
    let mime = match mime_for(image) {
        Some(mime) => mime,
        None => bail!("Unsupported image type: {}", image.display()),
    };
    let bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("Failed to read {}", image.display()))?;

    let ctx = InferenceContext::with_default_fetcher(config, runtime()?)?;
    info!("Recognizing {}", image.display());
    let prediction = ctx.recognize(FrameSource::DataUrl(encode_data_url(&bytes, mime))).await?;

    println!("{}", serde_json::to_string_pretty(&prediction)?);
    Ok(())
}

async fn inspect(config: &RecognizerConfig) -> anyhow::Result<()> {
    let fetcher = DefaultFetcher::new(config.request_timeout_secs.map(Duration::from_secs))?;
    let bytes = fetcher.fetch(&config.model_url).await?;
    let descriptor = ModelDescriptor::parse(&bytes)?;

    let labels = match fetcher
        .fetch(&config.labels_url)
        .await
        .and_then(|bytes| LabelTable::from_json(&bytes))
    {
        Ok(table) => Some(table.len()),
        Err(e) => {
            warn!("Failed to load labels {}: {}", config.labels_url, e);
            None
        }
    };

    let shape = descriptor.declared_input_shape();
    let input_size = shape
        .as_deref()
        .map(|shape| input_size_from_shape(shape, config.default_input_size))
        .unwrap_or(config.default_input_size);

    let summary = json!({
        "location": config.model_url,
        "format": descriptor.format,
        "declared_kind": descriptor.declared_kind().map(|kind| kind.to_string()),
        "load_order": descriptor.load_order().iter().map(|kind| kind.to_string()).collect::<Vec<_>>(),
        "weights": descriptor.weight_paths().collect::<Vec<_>>(),
        "input_shape": shape,
        "input_size": input_size,
        "labels": labels,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
