use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use color_image_prep::analysis::prepare_analysis_request;
use color_image_prep::image::{ImageProcessor, ImageService};
use color_image_prep::models::{Config, OutputFormat, Photo};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "color-image-prep")]
#[command(about = "Prepare photos for vision analysis")]
struct CliArgs {
    #[command(flatten)]
    overrides: ImageOverrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct ImageOverrides {
    /// Maximum width of derived images, in pixels.
    #[arg(long, global = true)]
    max_dimension: Option<u32>,

    /// Compression quality between 0 (exclusive) and 1.
    #[arg(long, global = true)]
    quality: Option<f32>,

    /// Output format: jpeg, png or webp.
    #[arg(long, global = true, value_parser = parse_format_arg)]
    format: Option<OutputFormat>,

    /// Directory that receives derived images.
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resize and recompress an image, printing the derived file path.
    Optimize { path: PathBuf },
    /// Print a file's contents as base64.
    Encode { path: PathBuf },
    /// Optimize and encode an image, printing the analysis request body.
    Prepare {
        path: PathBuf,
        /// Prompt to send instead of the default.
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Print an image's path and dimensions as JSON.
    Probe { path: PathBuf },
}

fn parse_format_arg(input: &str) -> std::result::Result<OutputFormat, String> {
    input.parse().map_err(|e| format!("{}", e))
}

fn apply_overrides(
    mut config: Config,
    overrides: ImageOverrides,
) -> color_image_prep::Result<Config> {
    if let Some(max_dimension) = overrides.max_dimension {
        config.image.max_dimension = max_dimension;
    }
    if let Some(quality) = overrides.quality {
        config.image.quality = quality;
    }
    if let Some(format) = overrides.format {
        config.image.format = format;
    }
    if let Some(output_dir) = overrides.output_dir {
        config.image.output_dir = output_dir;
    }
    config.image.validate()?;
    Ok(config)
}

async fn run(args: CliArgs) -> Result<()> {
    let config = apply_overrides(Config::from_env()?, args.overrides)?;
    let processor = ImageProcessor::new(config.image.clone())?;

    match args.command {
        Command::Optimize { path } => {
            let derived = processor.optimize(&path).await?;
            info!("Optimized {} -> {}", path.display(), derived.display());
            println!("{}", derived.display());
        }
        Command::Encode { path } => {
            let encoded = processor.encode_to_text(&path).await?;
            info!("Encoded {} ({} chars)", path.display(), encoded.len());
            println!("{}", encoded);
        }
        Command::Prepare { path, prompt } => {
            let prepared =
                prepare_analysis_request(&processor, &config, &path, prompt.as_deref()).await?;
            info!(
                "Prepared request for model {} from {}",
                prepared.request.model,
                prepared.optimized_path.display()
            );
            println!("{}", serde_json::to_string_pretty(&prepared.request)?);
        }
        Command::Probe { path } => {
            let photo = Photo::probe(&path).await?;
            println!("{}", serde_json::to_string_pretty(&photo)?);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "color_image_prep=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    if let Err(e) = run(args).await {
        error!("Image preparation failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format_arg() {
        assert_eq!(parse_format_arg("jpg").unwrap(), OutputFormat::Jpeg);
        let err = parse_format_arg("bmp").unwrap_err();
        assert!(err.contains("jpeg, png or webp"));
    }

    #[test]
    fn test_cli_parses_prepare_with_overrides() {
        let args = CliArgs::try_parse_from([
            "color-image-prep",
            "prepare",
            "/tmp/photo.png",
            "--prompt",
            "What color is it?",
            "--max-dimension",
            "800",
            "--format",
            "png",
        ])
        .unwrap();

        assert_eq!(args.overrides.max_dimension, Some(800));
        assert_eq!(args.overrides.format, Some(OutputFormat::Png));
        match args.command {
            Command::Prepare { path, prompt } => {
                assert_eq!(path, PathBuf::from("/tmp/photo.png"));
                assert_eq!(prompt.as_deref(), Some("What color is it?"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_apply_overrides() {
        let overrides = ImageOverrides {
            max_dimension: Some(640),
            quality: Some(0.5),
            format: None,
            output_dir: Some(PathBuf::from("/var/tmp/out")),
        };

        let config = apply_overrides(Config::default(), overrides).unwrap();
        assert_eq!(config.image.max_dimension, 640);
        assert_eq!(config.image.jpeg_quality(), 50);
        assert_eq!(config.image.format, OutputFormat::Jpeg);
        assert_eq!(config.image.output_dir, PathBuf::from("/var/tmp/out"));
    }

    #[test]
    fn test_apply_overrides_rejects_bad_quality() {
        let overrides = ImageOverrides {
            max_dimension: None,
            quality: Some(2.0),
            format: None,
            output_dir: None,
        };

        assert!(apply_overrides(Config::default(), overrides).is_err());
    }
}
