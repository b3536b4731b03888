use super::ImageService;
use crate::models::{ImageConfig, OutputFormat};
use crate::{Error, Result};
use async_trait::async_trait;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Proportional size for an image of `width`x`height` capped at `max_width`.
///
/// Images that already fit are returned unchanged; there is no upscaling.
pub fn scaled_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width {
        return (width, height);
    }

    let width_u64 = u64::from(width);
    let scaled = (u64::from(height) * u64::from(max_width) + width_u64 / 2) / width_u64;
    // scaled <= height, so it always fits back into u32
    (max_width, scaled.max(1) as u32)
}

pub struct ImageProcessor {
    config: ImageConfig,
}

impl ImageProcessor {
    pub fn new(config: ImageConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ImageConfig {
        &self.config
    }

    fn derived_path(&self, image_path: &Path) -> PathBuf {
        let stem = image_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "image".to_string());

        self.config.output_dir.join(format!(
            "{}_{}.{}",
            stem,
            Uuid::new_v4(),
            self.config.format.extension()
        ))
    }

    fn render_sync(source: Vec<u8>, config: ImageConfig, output_path: PathBuf) -> Result<()> {
        let mut decoder = ImageReader::new(Cursor::new(&source))
            .with_guessed_format()?
            .into_decoder()?;
        // Phone cameras store pixels unrotated and record the rotation in EXIF
        let orientation = decoder.orientation()?;
        let mut image = DynamicImage::from_decoder(decoder)?;
        image.apply_orientation(orientation);

        let (width, height) = scaled_dimensions(image.width(), image.height(), config.max_dimension);
        let resized = if (width, height) == (image.width(), image.height()) {
            image
        } else {
            image.resize_exact(width, height, FilterType::Lanczos3)
        };

        let mut encoded = Vec::new();
        match config.format {
            OutputFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());
                rgb.write_with_encoder(JpegEncoder::new_with_quality(
                    &mut encoded,
                    config.jpeg_quality(),
                ))?;
            }
            OutputFormat::Png => {
                resized.write_with_encoder(PngEncoder::new(&mut encoded))?;
            }
            OutputFormat::WebP => {
                let rgba = DynamicImage::ImageRgba8(resized.to_rgba8());
                rgba.write_with_encoder(WebPEncoder::new_lossless(&mut encoded))?;
            }
        }

        std::fs::write(&output_path, encoded)?;
        Ok(())
    }

    async fn render(&self, source: Vec<u8>, output_path: &Path) -> Result<()> {
        tokio::task::spawn_blocking({
            let config = self.config.clone();
            let output_path = output_path.to_path_buf();
            move || Self::render_sync(source, config, output_path)
        })
        .await
        .map_err(|e| Error::Invariant(format!("Image processing task join error: {}", e)))?
    }
}

#[async_trait]
impl ImageService for ImageProcessor {
    /// Derived files are written under the configured output directory and
    /// are never removed by the processor; deleting them is up to the caller.
    async fn optimize(&self, image_path: &Path) -> Result<PathBuf> {
        tracing::debug!("Optimizing image {}", image_path.display());

        let source = tokio::fs::read(image_path).await?;
        tokio::fs::create_dir_all(&self.config.output_dir).await?;

        let output_path = self.derived_path(image_path);
        self.render(source, &output_path).await?;

        tracing::debug!(
            "Wrote optimized image {} ({}, max width {})",
            output_path.display(),
            self.config.format,
            self.config.max_dimension
        );

        Ok(output_path)
    }

    async fn encode_to_text(&self, image_path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(image_path).await?;
        tracing::debug!(
            "Encoding {} ({} bytes) as base64",
            image_path.display(),
            bytes.len()
        );

        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    fn output_format(&self) -> OutputFormat {
        self.config.format
    }
}
