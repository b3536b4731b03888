//! Image preparation for transmission
//!
//! Shrinks and recompresses photos into derived images, and turns image files
//! into base64 text for embedding in JSON request bodies.

pub mod mock;
pub mod processor;

pub use mock::MockImageProcessor;
pub use processor::{scaled_dimensions, ImageProcessor};

use crate::models::OutputFormat;
use crate::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait ImageService: Send + Sync {
    /// Write a resized, recompressed copy of `image_path` and return its path.
    ///
    /// The EXIF orientation of the source is applied before resizing. The
    /// derived file is left in place; cleaning it up is the caller's job.
    async fn optimize(&self, image_path: &Path) -> Result<PathBuf>;

    /// Read the whole file at `image_path` as standard padded base64.
    async fn encode_to_text(&self, image_path: &Path) -> Result<String>;

    /// Format of the images produced by `optimize`.
    fn output_format(&self) -> OutputFormat;
}
