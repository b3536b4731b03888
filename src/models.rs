//! Data models and configuration
//!
//! Defines the records exchanged with the capture and analysis layers, plus
//! the configuration that drives image preparation.

use crate::constants;
use crate::{Error, Result};
use chrono::Utc;
use image::metadata::Orientation;
use image::{ImageDecoder, ImageReader};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A captured image on local storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Photo {
    pub path: String,
    pub width: u32,
    pub height: u32,
}

impl Photo {
    pub fn new(path: String, width: u32, height: u32) -> Self {
        Self {
            path,
            width,
            height,
        }
    }

    /// Build a `Photo` by reading the dimensions from the image header.
    ///
    /// The format is sniffed from the file contents and the dimensions are
    /// reported as displayed, after any EXIF rotation.
    pub async fn probe(path: &Path) -> Result<Self> {
        let owned = path.to_path_buf();
        let (width, height) = tokio::task::spawn_blocking(move || Self::read_dimensions(&owned))
            .await
            .map_err(|e| Error::Invariant(format!("Image probe task join error: {}", e)))??;

        Ok(Self::new(path.to_string_lossy().into_owned(), width, height))
    }

    fn read_dimensions(path: &Path) -> Result<(u32, u32)> {
        let mut decoder = ImageReader::open(path)?
            .with_guessed_format()?
            .into_decoder()?;
        let (width, height) = decoder.dimensions();

        match decoder.orientation()? {
            Orientation::Rotate90
            | Orientation::Rotate270
            | Orientation::Rotate90FlipH
            | Orientation::Rotate270FlipH => Ok((height, width)),
            _ => Ok((width, height)),
        }
    }
}

/// Output of one analysis request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub text: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub photo_path: String,
}

impl AnalysisResult {
    pub fn new(text: String, photo_path: String) -> Self {
        Self::with_timestamp(text, Utc::now().timestamp_millis(), photo_path)
    }

    pub fn with_timestamp(text: String, timestamp: i64, photo_path: String) -> Self {
        Self {
            text,
            timestamp,
            photo_path,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CameraPermissionStatus {
    pub granted: bool,
    pub can_ask_again: bool,
}

impl CameraPermissionStatus {
    /// True when access is missing but the platform still lets us ask for it.
    pub fn should_prompt(&self) -> bool {
        !self.granted && self.can_ask_again
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    WebP,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
        };
        f.write_str(name)
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            other => Err(Error::Config(format!(
                "Unsupported image format '{}'. Expected jpeg, png or webp",
                other
            ))),
        }
    }
}

/// Settings applied by the image processor to every derived image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageConfig {
    /// Maximum width in pixels.
    pub max_dimension: u32,
    /// Compression quality in `(0, 1]`. Only JPEG output uses it.
    pub quality: f32,
    pub format: OutputFormat,
    pub output_dir: PathBuf,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_dimension: constants::MAX_IMAGE_DIMENSION,
            quality: constants::IMAGE_COMPRESSION_QUALITY,
            // IMAGE_FORMAT is "jpeg"
            format: OutputFormat::Jpeg,
            output_dir: std::env::temp_dir().join(constants::OUTPUT_DIR_NAME),
        }
    }
}

impl ImageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_dimension == 0 {
            return Err(Error::Config(
                "Maximum image dimension must be greater than zero".to_string(),
            ));
        }
        if !(self.quality > 0.0 && self.quality <= 1.0) {
            return Err(Error::Config(format!(
                "Compression quality must be in (0, 1], got {}",
                self.quality
            )));
        }
        Ok(())
    }

    /// Quality mapped onto the JPEG encoder's 1..=100 scale.
    pub fn jpeg_quality(&self) -> u8 {
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

/// Settings for the request sent to the analysis API.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub model: String,
    pub max_tokens: u32,
    pub default_prompt: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: constants::CLAUDE_MODEL.to_string(),
            max_tokens: constants::CLAUDE_MAX_TOKENS,
            default_prompt: constants::DEFAULT_ANALYSIS_PROMPT.to_string(),
        }
    }
}

// Configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub image: ImageConfig,
    pub analysis: AnalysisConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Missing keys keep their
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(model) = lookup("CLAUDE_MODEL") {
            config.analysis.model = model;
        }
        if let Some(max_tokens) = parse_var(&lookup, "CLAUDE_MAX_TOKENS")? {
            config.analysis.max_tokens = max_tokens;
        }
        if let Some(prompt) = lookup("ANALYSIS_PROMPT") {
            config.analysis.default_prompt = prompt;
        }

        if let Some(max_dimension) = parse_var(&lookup, "MAX_IMAGE_DIMENSION")? {
            config.image.max_dimension = max_dimension;
        }
        if let Some(quality) = parse_var(&lookup, "IMAGE_COMPRESSION_QUALITY")? {
            config.image.quality = quality;
        }
        if let Some(format) = lookup("IMAGE_FORMAT") {
            config.image.format = format.parse()?;
        }
        if let Some(dir) = lookup("IMAGE_OUTPUT_DIR") {
            config.image.output_dir = PathBuf::from(dir);
        }

        config.image.validate()?;
        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("{} has invalid value '{}': {}", key, raw, e))),
        None => Ok(None),
    }
}
